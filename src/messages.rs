//! Client-facing response messages.

pub const REGISTRATION_SUCCESS: &str = "User registered successfully";
pub const LOGIN_SUCCESS: &str = "User logged in successfully";
pub const LOGOUT_SUCCESS: &str = "User logged out successfully";
pub const TOKEN_GENERATED: &str = "Token generated successfully";
pub const PASSWORD_RESET_SUCCESS: &str = "Password reset successfully";

pub const INVALID_CREDENTIALS: &str = "Invalid credentials";
pub const USER_NOT_FOUND: &str = "User not found";
pub const USER_EXISTS: &str = "User already exists";
pub const INVALID_TOKEN: &str = "Invalid or expired reset token";
pub const INVALID_UPDATE: &str = "Invalid updates!";
pub const AUTH_REQUIRED: &str = "Authentication required!";
pub const UNAUTHORISED: &str = "Unauthorised!";
pub const INTERNAL_SERVER_ERROR: &str = "Internal server error";

pub const TASK_CREATED: &str = "Task created successfully";
pub const TASK_UPDATED: &str = "Task updated successfully";
pub const TASK_DELETED: &str = "Task deleted successfully";
pub const TASK_NOT_FOUND: &str = "Task not found or you are not authorized";

pub const DATA_FETCHED: &str = "Data fetched successfully";
pub const DATA_UPDATED: &str = "Data updated successfully";
