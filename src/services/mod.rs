mod scim_provisioning;

pub use scim_provisioning::{ProvisioningResult, ScimProvisioningError, ScimUserHandler};
