#[cfg(test)]
pub mod test {
    use crate::configuration::{OutputType, ScalarField};
    use crate::project::Project;
    use crate::registry::Registry;
    use crate::solution::{Solution, SolutionField};
    use crate::target::{Target, TargetDecl};

    /// The Oxygen engine model in its declarative form.
    pub const OXYGEN_MODEL: &str = include_str!("../demos/oxygen/oxygen.model.toml");

    /// win64 / vs2022 / Release|Debug.
    pub fn default_targets() -> TargetDecl {
        TargetDecl::new()
            .axis("Platform", "win64")
            .axis("DevEnv", "vs2022")
            .axis("Optimization", "Release|Debug")
    }

    pub fn oxygen_target(optimization: &str) -> Target {
        Target::new([
            ("Platform", "win64"),
            ("DevEnv", "vs2022"),
            ("Optimization", optimization),
        ])
    }

    pub fn base_project() -> Project {
        Project::builder("BaseProject")
            .field("RootPath", r"[project.SharpmakeCsPath]\projects\[project.Name]")
            .field("SourceRootPath", r"[project.RootPath]\codebase")
            .configure(|c| {
                let debug = c.target().get("Optimization") == Some("Debug");

                c.set(ScalarField::ProjectFileName, "[project.Name]_[target.Platform]")?;
                if c.target().get("DevEnv") != Some("xcode") {
                    c.append(ScalarField::ProjectFileName, "_[target.DevEnv]")?;
                }
                c.set(
                    ScalarField::ProjectPath,
                    r"[project.SharpmakeCsPath]\solution\projects\[project.Name]",
                )?
                .set(
                    ScalarField::IntermediatePath,
                    r"[project.SharpmakeCsPath]\solution\intermediate\[project.Name]_[target.Optimization]",
                )?
                .set(
                    ScalarField::TargetPath,
                    r"[project.SharpmakeCsPath]\solution\output\[project.Name]_[target.Optimization]",
                )?
                .option("Vc.Compiler.Exceptions.Disable")?
                .define("_HAS_EXCEPTIONS=0")?
                .option(if debug {
                    "Vc.Compiler.RuntimeLibrary.MultiThreadedDebugDLL"
                } else {
                    "Vc.Compiler.RuntimeLibrary.MultiThreaded"
                })?
                .option("Vc.Compiler.CppLanguageStandard.Latest")?
                .option("Vc.Compiler.DefineCPlusPlus.Enable")?
                .custom_property("CustomOptimizationProperty", "Custom-[target.Optimization]")?
                .include_path("[project.SourceRootPath]")?
                .define("OXYWIN32")?
                .define(if debug { "OXYDEBUG" } else { "OXYRELEASE" })?;
                Ok(())
            })
            .build()
    }

    pub fn oxygen_project() -> Project {
        Project::builder("oxygen")
            .base("BaseProject")
            .targets(default_targets())
            .configure(|c| {
                c.output(OutputType::Exe)?
                    .set(ScalarField::SolutionFolder, "Engine")?
                    .set(ScalarField::PrecompHeader, "OxygenPCH.h")?
                    .set(ScalarField::PrecompSource, "OxygenPCH.cpp")?
                    .include_path(r"[project.SourceRootPath]\engine")?
                    .option("Vc.Compiler.FloatingPointModel.Fast")?
                    .library_file("d3d11.lib")?
                    .library_file("dxgi.lib")?
                    .library_file("d3dcompiler.lib")?;
                Ok(())
            })
            .build()
    }

    pub fn oxygen_solution() -> Solution {
        Solution::builder("Oxygen")
            .targets(
                TargetDecl::new()
                    .axis("Platform", "win64")
                    .axis("DevEnv", "vs2022")
                    .axis("Optimization", "Debug|Release"),
            )
            .configure(|c| {
                c.set(
                    SolutionField::SolutionFileName,
                    "[solution.Name]_[target.DevEnv]_[target.Platform]",
                )?
                .set(SolutionField::SolutionPath, r"[solution.SharpmakeCsPath]\solution")?
                .add_project("oxygen");
                Ok(())
            })
            .build()
    }

    /// The Oxygen model defined in `/work`.
    pub fn oxygen_registry() -> Registry {
        Registry::builder()
            .definition_dir("/work")
            .project(base_project())
            .project(oxygen_project())
            .solution(oxygen_solution())
            .build()
            .unwrap()
    }

    #[test]
    fn oxygen_registry_builds() {
        let registry = oxygen_registry();
        assert_eq!(registry.projects().count(), 2);
        assert!(registry.is_leaf("oxygen"));
        assert_eq!(registry.project_targets("oxygen").unwrap().len(), 2);
    }
}
