//! Core vocabulary for exception discovery: method identity, descriptor
//! erasure, resolved call targets and the front-end seam.

mod callable;
pub mod descriptor;
mod discovery;
pub mod frontend;
mod method;
pub mod names;
mod origin;

pub use crate::callable::{
    Callable, JavaMethod, KotlinFunction, Modifiers, ResolvedCallable, TypeParameter,
};
pub use crate::descriptor::Dialect;
pub use crate::discovery::{Discovery, DiscoveryMap};
pub use crate::frontend::{CallManifest, FrontEnd, ManifestCall, ManifestFrontEnd};
pub use crate::method::{MethodInformation, ParseMethodError};
pub use crate::origin::Origin;
