//! Stage scheduler
//!
//! Every piece of per-frame work registers against one named stage. The
//! stages form a single linear chain, declared once at startup and never
//! mutated: all work in stage N runs to completion before stage N+1
//! starts. `FinalCleanup` sits outside the per-frame chain and runs once
//! at shutdown.

use crate::core::context::EngineContext;
use crate::core::error::{EngineError, EngineResult};

/// Named stages of the frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Platform event pumping and input state updates
    InputUpdate,
    /// Simulation: gameplay, motion integration
    Update,
    /// Collision detection and response
    Collisions,
    /// Acquire the next image and open command recording
    PreDraw,
    /// Record draw calls
    Draw,
    /// Submit and present
    PostDraw,
    /// Clear transient per-frame state
    Housekeeping,
    /// Shutdown-time work; not part of the per-frame chain
    FinalCleanup,
}

impl Stage {
    /// Display name of the stage
    pub fn name(self) -> &'static str {
        match self {
            Self::InputUpdate => "InputUpdate",
            Self::Update => "Update",
            Self::Collisions => "Collisions",
            Self::PreDraw => "PreDraw",
            Self::Draw => "Draw",
            Self::PostDraw => "PostDraw",
            Self::Housekeeping => "Housekeeping",
            Self::FinalCleanup => "FinalCleanup",
        }
    }

    fn index(self) -> usize {
        match self {
            Self::InputUpdate => 0,
            Self::Update => 1,
            Self::Collisions => 2,
            Self::PreDraw => 3,
            Self::Draw => 4,
            Self::PostDraw => 5,
            Self::Housekeeping => 6,
            Self::FinalCleanup => 7,
        }
    }

    const COUNT: usize = 8;
}

/// Declaration of one stage and its single predecessor edge
#[derive(Debug, Clone, Copy)]
pub struct StageDecl {
    /// The stage being declared
    pub stage: Stage,
    /// Stage that must complete first; `None` only for the chain head
    pub after: Option<Stage>,
}

/// The per-frame chain, in dependency order
pub const FRAME_STAGE_DECLS: [StageDecl; 7] = [
    StageDecl { stage: Stage::InputUpdate, after: None },
    StageDecl { stage: Stage::Update, after: Some(Stage::InputUpdate) },
    StageDecl { stage: Stage::Collisions, after: Some(Stage::Update) },
    StageDecl { stage: Stage::PreDraw, after: Some(Stage::Collisions) },
    StageDecl { stage: Stage::Draw, after: Some(Stage::PreDraw) },
    StageDecl { stage: Stage::PostDraw, after: Some(Stage::Draw) },
    StageDecl { stage: Stage::Housekeeping, after: Some(Stage::PostDraw) },
];

/// Validated linear chain of frame stages
pub struct StageChain {
    order: Vec<Stage>,
}

impl StageChain {
    /// Build and validate a chain from declarations. Each stage must name
    /// its immediate predecessor; branching or cycles are rejected.
    pub fn build(decls: &[StageDecl]) -> EngineResult<Self> {
        let mut order = Vec::with_capacity(decls.len());
        for (i, decl) in decls.iter().enumerate() {
            if decl.stage == Stage::FinalCleanup {
                return Err(EngineError::type_mismatch(
                    "schedule",
                    "FinalCleanup cannot be part of the frame chain",
                ));
            }
            if order.contains(&decl.stage) {
                return Err(EngineError::type_mismatch(
                    "schedule",
                    format!("stage {} declared twice", decl.stage.name()),
                ));
            }
            let expected = if i == 0 { None } else { Some(decls[i - 1].stage) };
            if decl.after != expected {
                return Err(EngineError::type_mismatch(
                    "schedule",
                    format!(
                        "stage {} must depend on its immediate predecessor",
                        decl.stage.name()
                    ),
                ));
            }
            order.push(decl.stage);
        }
        Ok(Self { order })
    }

    /// Stages in execution order
    pub fn order(&self) -> &[Stage] {
        &self.order
    }
}

/// A unit of per-frame work bound to a single stage
pub trait FrameSystem {
    /// Name used in diagnostics
    fn name(&self) -> &str;

    /// The one stage this system runs in
    fn stage(&self) -> Stage;

    /// Execute the system for this frame
    fn run(&mut self, ctx: &mut EngineContext, delta_time: f32) -> EngineResult<()>;
}

struct ClosureSystem<F> {
    name: String,
    stage: Stage,
    body: F,
}

impl<F> FrameSystem for ClosureSystem<F>
where
    F: FnMut(&mut EngineContext, f32) -> EngineResult<()>,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn stage(&self) -> Stage {
        self.stage
    }

    fn run(&mut self, ctx: &mut EngineContext, delta_time: f32) -> EngineResult<()> {
        (self.body)(ctx, delta_time)
    }
}

/// Runs registered systems stage by stage, sequentially within a stage,
/// in registration order
pub struct StageScheduler {
    chain: StageChain,
    units: Vec<Vec<Box<dyn FrameSystem>>>,
}

impl StageScheduler {
    /// Build the scheduler over the standard frame chain
    pub fn new() -> EngineResult<Self> {
        let chain = StageChain::build(&FRAME_STAGE_DECLS)?;
        let mut units = Vec::with_capacity(Stage::COUNT);
        units.resize_with(Stage::COUNT, Vec::new);
        Ok(Self { chain, units })
    }

    /// Register a boxed system in its declared stage
    pub fn register(&mut self, system: Box<dyn FrameSystem>) {
        let stage = system.stage();
        log::debug!("registered system '{}' in {}", system.name(), stage.name());
        self.units[stage.index()].push(system);
    }

    /// Register a closure as a system
    pub fn register_fn<F>(&mut self, stage: Stage, name: impl Into<String>, body: F)
    where
        F: FnMut(&mut EngineContext, f32) -> EngineResult<()> + 'static,
    {
        self.register(Box::new(ClosureSystem {
            name: name.into(),
            stage,
            body,
        }));
    }

    /// Run one frame: every stage in chain order, every unit of a stage to
    /// completion before the next stage starts
    pub fn run_frame(&mut self, ctx: &mut EngineContext, delta_time: f32) -> EngineResult<()> {
        for i in 0..self.chain.order.len() {
            let stage = self.chain.order[i];
            for unit in &mut self.units[stage.index()] {
                log::trace!("{}: {}", stage.name(), unit.name());
                unit.run(ctx, delta_time)?;
            }
        }
        Ok(())
    }

    /// Run the shutdown-only `FinalCleanup` stage once
    pub fn run_final_cleanup(&mut self, ctx: &mut EngineContext) -> EngineResult<()> {
        for unit in &mut self.units[Stage::FinalCleanup.index()] {
            log::debug!("FinalCleanup: {}", unit.name());
            unit.run(ctx, 0.0)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::testing::test_context;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn chain_builds_from_canonical_declarations() {
        let chain = StageChain::build(&FRAME_STAGE_DECLS).unwrap();
        assert_eq!(chain.order().len(), 7);
        assert_eq!(chain.order()[0], Stage::InputUpdate);
        assert_eq!(chain.order()[6], Stage::Housekeeping);
    }

    #[test]
    fn chain_rejects_wrong_predecessor() {
        let decls = [
            StageDecl { stage: Stage::InputUpdate, after: None },
            StageDecl { stage: Stage::Update, after: Some(Stage::Collisions) },
        ];
        assert!(StageChain::build(&decls).is_err());
    }

    #[test]
    fn chain_rejects_duplicate_stage() {
        let decls = [
            StageDecl { stage: Stage::InputUpdate, after: None },
            StageDecl { stage: Stage::InputUpdate, after: Some(Stage::InputUpdate) },
        ];
        assert!(StageChain::build(&decls).is_err());
    }

    #[test]
    fn probes_run_in_fixed_stage_order_regardless_of_registration() {
        let mut scheduler = StageScheduler::new().unwrap();
        let log: Rc<RefCell<Vec<&'static str>>> = Rc::new(RefCell::new(Vec::new()));

        // Deliberately register in scrambled order
        let stages = [
            Stage::PostDraw,
            Stage::InputUpdate,
            Stage::Housekeeping,
            Stage::Draw,
            Stage::Update,
            Stage::PreDraw,
            Stage::Collisions,
        ];
        for stage in stages {
            let log = Rc::clone(&log);
            scheduler.register_fn(stage, format!("probe-{}", stage.name()), move |_, _| {
                log.borrow_mut().push(stage.name());
                Ok(())
            });
        }

        let mut ctx = test_context();
        scheduler.run_frame(&mut ctx, 0.016).unwrap();

        assert_eq!(
            *log.borrow(),
            vec![
                "InputUpdate",
                "Update",
                "Collisions",
                "PreDraw",
                "Draw",
                "PostDraw",
                "Housekeeping"
            ]
        );
    }

    #[test]
    fn units_within_a_stage_run_in_registration_order() {
        let mut scheduler = StageScheduler::new().unwrap();
        let log: Rc<RefCell<Vec<u32>>> = Rc::new(RefCell::new(Vec::new()));
        for i in 0..3 {
            let log = Rc::clone(&log);
            scheduler.register_fn(Stage::Update, format!("unit-{i}"), move |_, _| {
                log.borrow_mut().push(i);
                Ok(())
            });
        }

        let mut ctx = test_context();
        scheduler.run_frame(&mut ctx, 0.016).unwrap();
        assert_eq!(*log.borrow(), vec![0, 1, 2]);
    }

    #[test]
    fn final_cleanup_runs_only_on_request() {
        let mut scheduler = StageScheduler::new().unwrap();
        let log: Rc<RefCell<Vec<&'static str>>> = Rc::new(RefCell::new(Vec::new()));
        let probe_log = Rc::clone(&log);
        scheduler.register_fn(Stage::FinalCleanup, "cleanup-probe", move |_, _| {
            probe_log.borrow_mut().push("cleanup");
            Ok(())
        });

        let mut ctx = test_context();
        scheduler.run_frame(&mut ctx, 0.016).unwrap();
        assert!(log.borrow().is_empty());

        scheduler.run_final_cleanup(&mut ctx).unwrap();
        assert_eq!(*log.borrow(), vec!["cleanup"]);
    }

    #[test]
    fn failing_unit_stops_the_frame() {
        let mut scheduler = StageScheduler::new().unwrap();
        scheduler.register_fn(Stage::Update, "boom", |_, _| {
            Err(crate::core::error::EngineError::not_found("test", "missing"))
        });
        let reached: Rc<RefCell<bool>> = Rc::new(RefCell::new(false));
        let flag = Rc::clone(&reached);
        scheduler.register_fn(Stage::Draw, "later", move |_, _| {
            *flag.borrow_mut() = true;
            Ok(())
        });

        let mut ctx = test_context();
        assert!(scheduler.run_frame(&mut ctx, 0.016).is_err());
        assert!(!*reached.borrow());
    }
}
