use state_machines::state_machine;

state_machine! {
    name: OrchestrationMachine,
    state: OrchestrationState,
    initial: Ready,
    states: [Ready, RecipeDone, ScalingDone, GraphDone, ValidationDone, UiDone, Persisted, Failed],
    events {
        engineer { transition: { from: Ready, to: RecipeDone } }
        scale { transition: { from: RecipeDone, to: ScalingDone } }
        build_graph { transition: { from: ScalingDone, to: GraphDone } }
        validate { transition: { from: GraphDone, to: ValidationDone } }
        design_ui { transition: { from: ValidationDone, to: UiDone } }
        persist {
            transition: { from: UiDone, to: Persisted }
            transition: { from: Ready, to: Persisted }
            transition: { from: RecipeDone, to: Persisted }
            transition: { from: ScalingDone, to: Persisted }
            transition: { from: GraphDone, to: Persisted }
            transition: { from: ValidationDone, to: Persisted }
        }
        abort {
            transition: { from: Ready, to: Failed }
            transition: { from: RecipeDone, to: Failed }
            transition: { from: ScalingDone, to: Failed }
            transition: { from: GraphDone, to: Failed }
            transition: { from: ValidationDone, to: Failed }
            transition: { from: UiDone, to: Failed }
        }
    }
}

pub fn ready() -> OrchestrationMachine<(), Ready> {
    OrchestrationMachine::new(())
}

#[cfg(test)]
mod tests {
    use super::*;

    // `Orchestrator::drive` uses a plain sequential match rather than this
    // machine at runtime, because it needs to skip the remaining agents and
    // still persist a partial result on the first failure -- a transition
    // this typestate can't express without collapsing every state into
    // `Failed`. The type still documents the one valid happy-path ordering,
    // checked here the same way the teacher's ingestion pipeline exercises
    // its own machine.
    #[test]
    fn happy_path_reaches_persisted() {
        let machine = ready()
            .engineer()
            .expect("ready -> recipe_done")
            .scale()
            .expect("recipe_done -> scaling_done")
            .build_graph()
            .expect("scaling_done -> graph_done")
            .validate()
            .expect("graph_done -> validation_done")
            .design_ui()
            .expect("validation_done -> ui_done");
        let _persisted = machine.persist().expect("ui_done -> persisted");
    }

    #[test]
    fn any_stage_can_abort() {
        let machine = ready().engineer().expect("ready -> recipe_done");
        let _failed = machine.abort().expect("recipe_done -> failed");
    }

    #[test]
    fn incomplete_run_can_still_persist() {
        let machine = ready().engineer().expect("ready -> recipe_done");
        let _persisted = machine.persist().expect("recipe_done -> persisted");
    }
}
