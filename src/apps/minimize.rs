use workflow::{Binding, Workflow};

use super::{toolkit_task, Application};

/// Force-field energy minimization of a single molecule.
pub struct Minimization;

impl Application for Minimization {
    fn name(&self) -> &'static str {
        "minimize"
    }

    fn description(&self) -> &'static str {
        "Energy minimization with an assigned force field"
    }

    fn workflow(&self) -> Workflow {
        Workflow::new("Energy minimization")
            .task(
                toolkit_task("read_molecule")
                    .input("description", Binding::Job),
            )
            .task(
                toolkit_task("prep_forcefield")
                    .output_of("molecule", "read_molecule", "molecule"),
            )
            .preprocess_here()
            .task(
                toolkit_task("minimization")
                    .output_of("molecule", "prep_forcefield", "molecule")
                    .input("nsteps", Binding::Value(500.into()))
                    .artifact("trajectory.pdb"),
            )
            .output("minimized.pdb", "minimization", "pdbstring")
            .output("energies", "minimization", "energies")
            .output("trajectory.pdb", "minimization", "trajectory.pdb")
            .output("minimization.log", "minimization", "stdout")
            .output("final_energy", "minimization", "final_energy")
    }
}
