pub mod storage;
pub mod storage_service;
