//! Compiles alignment, layout and schedules into one frame-aligned [`plan::RenderPlan`].

pub mod compiler;
/// Config-driven planning of a whole job.
pub mod job_plan;
pub mod plan;
