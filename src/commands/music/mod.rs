pub mod leave;
pub mod play;

pub mod utils;

use crate::{CommandResult, Context};
