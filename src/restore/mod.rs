pub mod script;

pub use script::{render_restoration_script, MissingObjectPolicy, RestorationScript, ScriptOptions};
