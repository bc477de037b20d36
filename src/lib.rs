pub mod configuration;
pub mod controller;
pub mod data_capture;
pub mod error_handling;
pub mod network;
pub mod protocol;
pub mod session_management;
pub mod storage;
