mod authorization_service;

pub use authorization_service::AuthorizationService;
