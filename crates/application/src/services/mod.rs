mod chat_service;
mod chat_service_tests;

pub use chat_service::{ChatService, ChatServiceDependencies};
