use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use crate::analysis::RestorationPlan;

const BANNER: &str = "-- =====================================================";

const FOLLOW_UP: [&str; 4] = [
    "Insert initial data (see the data-only dump)",
    "Recreate anything listed under NOT FOUND by hand",
    "Set up any additional configuration (roles, extensions settings)",
    "Verify all objects were created successfully",
];

/// What to emit for an object whose statement could not be relocated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingObjectPolicy {
    /// `-- NOT FOUND: ...` line where the statement would have been
    #[default]
    Placeholder,
    Skip,
}

impl std::str::FromStr for MissingObjectPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "placeholder" => Ok(MissingObjectPolicy::Placeholder),
            "skip" => Ok(MissingObjectPolicy::Skip),
            _ => Err(format!("Invalid missing-object policy: {}. Use placeholder or skip", s)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScriptOptions {
    pub missing: MissingObjectPolicy,
    pub generated_at: DateTime<Utc>,
    /// Dump the statements were copied from, shown in the header
    pub source: Option<String>,
}

impl Default for ScriptOptions {
    fn default() -> Self {
        Self {
            missing: MissingObjectPolicy::default(),
            generated_at: Utc::now(),
            source: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RestorationScript {
    pub text: String,
    /// Statements copied into the script
    pub written: usize,
    /// `"<kind> <identifier>"` of every object that could not be relocated
    pub missing: Vec<String>,
}

impl RestorationScript {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Render `plan` as a phased SQL script.
///
/// Every phase gets a banner even when empty, so the layout of two scripts
/// can be compared line by line.
pub fn render_restoration_script(plan: &RestorationPlan, options: &ScriptOptions) -> RestorationScript {
    let mut text = String::from("-- Database Restoration Script\n");
    let mut written = 0;
    let mut missing = Vec::new();

    text.push_str(&format!(
        "-- Generated on: {}\n",
        options.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    if let Some(source) = &options.source {
        text.push_str(&format!("-- Source dump: {}\n", source));
    }
    text.push_str("-- Objects are created in dependency order, one phase at a time\n\n");

    for (phase, objects) in plan.phases() {
        text.push_str(&format!("{}\n-- {}\n{}\n\n", BANNER, phase, BANNER));

        for located in objects {
            let object = &located.object;
            match &located.statement {
                Some(statement) => {
                    text.push_str(&format!(
                        "-- Creating {}: {}\n{}\n\n",
                        object.kind.label(),
                        object.identifier(),
                        statement.text
                    ));
                    written += 1;
                }
                None => {
                    warn!("No statement found for {}", object);
                    missing.push(object.to_string());
                    if options.missing == MissingObjectPolicy::Placeholder {
                        text.push_str(&format!(
                            "-- NOT FOUND: {} {} (statement could not be relocated in the dump)\n\n",
                            object.kind.label(),
                            object.identifier()
                        ));
                    }
                }
            }
        }
    }

    text.push_str(&format!("{}\n-- RESTORATION COMPLETE\n{}\n\n", BANNER, BANNER));
    text.push_str(&format!(
        "-- {} object(s) written, {} not found.\n",
        written,
        missing.len()
    ));
    text.push_str("-- You may now need to:\n");
    for (i, step) in FOLLOW_UP.iter().enumerate() {
        text.push_str(&format!("-- {}. {}\n", i + 1, step));
    }

    debug!("Rendered restoration script: {} written, {} missing", written, missing.len());

    RestorationScript { text, written, missing }
}
