mod draft;
mod machine;

pub use draft::{DraftPatch, Location, ProjectDraft, ProjectType};
pub use machine::{
    step_title, ProjectWizard, SubmitOutcome, WizardError, WizardState, DEFAULT_TOTAL_STEPS,
    PROJECTS_LISTING_ROUTE,
};
