pub mod ai_service;
pub mod analysis_service;
pub mod audio_ingest;
pub mod interview_service;
pub mod question_service;
pub mod storage_service;
pub mod transcript;
pub mod visibility;
