//! Account models

pub mod query;
pub mod requests;
pub mod role;
pub mod user;

// Re-export for convenience
pub use query::{ListUsersParams, Page, Pagination, SortField, SortOrder, UserQuery};
pub use requests::{
    BulkUpdateRequest, CreateStaffRequest, LoginRequest, RegisterRequest, UpdatePasswordRequest,
    UpdateProfileRequest, UpdateRoleRequest, UpdateStatusRequest,
};
pub use role::{Role, UserStatus};
pub use user::{NewUser, UpdateUser, User, UserResponse};
