pub const QUESTION_GROUPS_URL: &str = "/question-groups";
pub const QUESTION_GROUP_URL: &str = "/question-groups/{id}";
pub const ALL_QUESTIONS_URL: &str = "/all-questions";
pub const PHASED_QUESTIONS_URL: &str = "/phased-questions";
pub const FRAGRANCE_IMAGES_URL: &str = "/fragrance-images";
pub const EXTEND_TEXT_URL: &str = "/extend-text";

pub const SESSIONS_URL: &str = "/sessions";
pub const SESSION_URL: &str = "/sessions/{id}";
pub const CHECK_INCOMPLETE_URL: &str = "/sessions/check-incomplete";
pub const SESSION_HISTORY_URL: &str = "/sessions/history";
pub const COMPLETE_SESSION_URL: &str = "/sessions/{id}/complete";
pub const ABANDON_SESSION_URL: &str = "/sessions/{id}/abandon";
pub const SESSION_REPORT_URL: &str = "/sessions/{id}/report";
pub const SESSION_ANSWERS_URL: &str = "/sessions/{id}/answers";
pub const SUBMIT_PART_URL: &str = "/sessions/{id}/submit-part/{part}";

pub const USER_SESSION_COOKIE_NAME: &str = "user_session";

// Quiz session defaults
pub const SESSION_ID_PREFIX: &str = "AROMA_";
pub const SESSION_TOKEN_LEN: usize = 32;
pub const DEFAULT_HISTORY_LIMIT: i64 = 10;
pub const MAX_HISTORY_LIMIT: i64 = 100;

// Stages
pub const FIRST_STAGE: i64 = 1;
pub const SCORING_STAGE: i64 = 3;
pub const FINAL_STAGE: i64 = 4;

pub fn stage_group_id(stage: i64) -> String {
    format!("part{stage}")
}

// Scoring
pub const MAX_CLASSIFIED_ANSWERS: usize = 20;
pub const CATEGORY_IMAGE_EXTENSION: &str = ".png";

// External AI service
pub const DEFAULT_AI_BASE_URL: &str = "https://dashscope.aliyuncs.com";
pub const DEFAULT_AI_MODEL: &str = "qwen-plus";
pub const DEFAULT_AI_TIMEOUT_SECS: u64 = 15;
pub const EXTEND_TEXT_SYSTEM_PROMPT: &str = "你是一个专业的文案扩写助手，擅长将简洁的描述扩展为更丰富、生动的表达。请保持原文的核心意思，同时增加细节和表现力。尽可能详细的描述用户感觉最舒适的场景，字数控制在30字以内";
