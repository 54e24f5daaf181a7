//! Output sinks for generation units.

use std::io::Write;

use crate::driver::{Generation, GenerationUnit};
use crate::error::MatrixError;

/// Receives generation units in order.
pub trait Emitter {
    fn emit(&mut self, unit: &GenerationUnit) -> Result<(), MatrixError>;
}

/// Writes one JSON document per line for every unit.
pub struct JsonLinesEmitter<W: Write> {
    out: W,
}

impl<W: Write> JsonLinesEmitter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Emitter for JsonLinesEmitter<W> {
    fn emit(&mut self, unit: &GenerationUnit) -> Result<(), MatrixError> {
        serde_json::to_writer(&mut self.out, unit)?;
        self.out.write_all(b"\n").map_err(serde_json::Error::io)?;
        Ok(())
    }
}

impl Generation {
    /// Feed every unit to `emitter` in generation order.
    pub fn emit_all(&self, emitter: &mut dyn Emitter) -> Result<(), MatrixError> {
        for unit in &self.units {
            emitter.emit(unit)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::generate;
    use crate::fixtures::test::oxygen_registry;

    #[test]
    fn one_line_per_unit() {
        let generation = generate(&oxygen_registry()).unwrap();
        let mut emitter = JsonLinesEmitter::new(Vec::new());
        generation.emit_all(&mut emitter).unwrap();

        let text = String::from_utf8(emitter.into_inner()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["solution"]["solution"], "Oxygen");
        assert_eq!(first["target"]["Optimization"], "Debug");
        assert_eq!(first["projects"][0]["project"], "oxygen");
        assert_eq!(
            first["projects"][0]["scalars"]["ProjectFileName"],
            "oxygen_win64_vs2022"
        );
        assert_eq!(first["projects"][0]["output"], "Exe");
    }

    #[test]
    fn target_axes_serialize_in_declaration_order() {
        let generation = generate(&oxygen_registry()).unwrap();
        let json = serde_json::to_string(&generation.units[0].target).unwrap();
        assert_eq!(
            json,
            r#"{"Platform":"win64","DevEnv":"vs2022","Optimization":"Debug"}"#
        );
    }

    #[test]
    fn diagnostics_serialize_with_kind_tag() {
        let d = crate::diagnostic::Diagnostic::EmptyTargetExpansion {
            unit: "tools".into(),
        };
        assert_eq!(
            serde_json::to_string(&d).unwrap(),
            r#"{"kind":"EmptyTargetExpansion","unit":"tools"}"#
        );
    }

    struct Counting(usize);

    impl Emitter for Counting {
        fn emit(&mut self, _unit: &GenerationUnit) -> Result<(), MatrixError> {
            self.0 += 1;
            Ok(())
        }
    }

    #[test]
    fn custom_emitters_see_every_unit() {
        let generation = generate(&oxygen_registry()).unwrap();
        let mut counting = Counting(0);
        generation.emit_all(&mut counting).unwrap();
        assert_eq!(counting.0, 2);
    }
}
