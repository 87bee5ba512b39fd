pub const SIGN_UP: &str = "/api/auth/signup";
pub const SIGN_IN: &str = "/api/auth/signin";
pub const REFRESH: &str = "/api/auth/refresh";
pub const LOGOUT: &str = "/api/auth/logout";
pub const CHECK_EMAIL: &str = "/api/auth/check-email";

pub const CURRENT_USER: &str = "/api/users/me";

pub const HEALTH: &str = "/actuator/health";
pub const INFO: &str = "/actuator/info";
