// ABOUTME: Deployment orchestration over one remote host.
// ABOUTME: Exports the lifecycle runner, remote layout, upload and activation pieces.

mod activate;
mod context;
mod deployment;
mod error;
mod layout;
mod upload;

pub use activate::{Activation, ActivationStrategy, activate_revision};
pub use context::{RunContext, deployer_identity};
pub use deployment::Deployer;
pub use error::DeployError;
pub use layout::RemoteLayout;
pub use upload::upload_application_files;
