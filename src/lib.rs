pub mod combine;
pub mod config;
pub mod crawler;
pub mod normalize;
pub mod official;
pub mod storage;
