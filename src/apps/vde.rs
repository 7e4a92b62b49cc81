use workflow::{Binding, TaskSpec, Workflow};

use super::{toolkit_task, Application};

/// Vertical detachment energy of an anion.
pub struct Vde;

impl Application for Vde {
    fn name(&self) -> &'static str {
        "vde"
    }

    fn description(&self) -> &'static str {
        "Vertical detachment energy of an anionic molecule"
    }

    fn workflow(&self) -> Workflow {
        Workflow::new("Vertical detachment energy")
            .task(
                toolkit_task("read_molecule")
                    .input("description", Binding::Job),
            )
            .task(
                toolkit_task("prep_molecule")
                    .output_of("molecule", "read_molecule", "molecule"),
            )
            .preprocess_here()
            .task(
                TaskSpec::front_end(
                    "confirm_molecule",
                    "Confirm the prepared structure, its charge and multiplicity",
                )
                .output_of("pdbstring", "prep_molecule", "pdbstring"),
            )
            .task(
                toolkit_task("vde_calculation")
                    .output_of("molecule", "prep_molecule", "molecule")
                    .output_of("charge", "confirm_molecule", "charge")
                    .output_of("multiplicity", "confirm_molecule", "multiplicity"),
            )
            .output("optimized.pdb", "vde_calculation", "pdbstring")
            .output("results", "vde_calculation", "results")
            .output("vde", "vde_calculation", "vde")
            .output("vde.log", "vde_calculation", "stdout")
    }
}
