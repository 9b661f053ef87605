//! Kernel records: everything needed to emit one C function.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{RegistryError, Result};

/// The body of a generated function.
///
/// `statements` is usually the output of the lowerer; `preamble` and
/// `postamble` carry free-form declarations and loop scaffolding.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KernelBody {
    pub preamble: String,
    pub statements: String,
    pub postamble: String,
}

impl KernelBody {
    pub fn new(statements: impl Into<String>) -> Self {
        Self {
            statements: statements.into(),
            ..Self::default()
        }
    }

    pub fn with_preamble(mut self, preamble: impl Into<String>) -> Self {
        self.preamble = preamble.into();
        self
    }

    pub fn with_postamble(mut self, postamble: impl Into<String>) -> Self {
        self.postamble = postamble.into();
        self
    }

    /// Concatenated body text, each non-empty part ending in a newline.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for part in [&self.preamble, &self.statements, &self.postamble] {
            if part.is_empty() {
                continue;
            }
            out.push_str(part);
            if !part.ends_with('\n') {
                out.push('\n');
            }
        }
        out
    }
}

/// A registered C function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KernelRecord {
    pub name: String,
    pub c_type: String,
    pub params: String,
    pub includes: Vec<String>,
    pub include_code_parameters_h: bool,
    pub body: KernelBody,
    /// Grouping key, e.g. the output subdirectory.
    pub subdirectory: String,
    pub desc: String,
    pub tags: BTreeMap<String, String>,
}

fn is_c_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl KernelRecord {
    pub fn builder(name: impl Into<String>) -> KernelRecordBuilder {
        KernelRecordBuilder {
            record: KernelRecord {
                name: name.into(),
                c_type: "void".to_string(),
                params: "void".to_string(),
                includes: Vec::new(),
                include_code_parameters_h: false,
                body: KernelBody::default(),
                subdirectory: String::new(),
                desc: String::new(),
                tags: BTreeMap::new(),
            },
        }
    }

    /// `c_type name(params)`
    pub fn prototype(&self) -> String {
        format!("{} {}({})", self.c_type, self.name, self.params)
    }

    /// The complete function, ready to be written to its own source file.
    pub fn full_function(&self) -> String {
        let mut out = String::new();
        for inc in &self.includes {
            if inc.starts_with('<') {
                out.push_str(&format!("#include {inc}\n"));
            } else {
                out.push_str(&format!("#include \"{inc}\"\n"));
            }
        }
        if !self.includes.is_empty() {
            out.push('\n');
        }
        if !self.desc.is_empty() {
            out.push_str("/**\n");
            for line in self.desc.lines() {
                if line.is_empty() {
                    out.push_str(" *\n");
                } else {
                    out.push_str(&format!(" * {line}\n"));
                }
            }
            out.push_str(" */\n");
        }
        out.push_str(&self.prototype());
        out.push_str(" {\n");
        if self.include_code_parameters_h {
            out.push_str("#include \"set_CodeParameters.h\"\n");
        }
        out.push_str(&self.body.render());
        out.push_str(&format!("}} // END FUNCTION {}\n", self.name));
        out
    }
}

/// Builder for [`KernelRecord`].
#[derive(Debug, Clone)]
pub struct KernelRecordBuilder {
    record: KernelRecord,
}

impl KernelRecordBuilder {
    pub fn c_type(mut self, c_type: impl Into<String>) -> Self {
        self.record.c_type = c_type.into();
        self
    }

    pub fn params(mut self, params: impl Into<String>) -> Self {
        self.record.params = params.into();
        self
    }

    pub fn include(mut self, include: impl Into<String>) -> Self {
        self.record.includes.push(include.into());
        self
    }

    pub fn includes<S: Into<String>>(mut self, includes: impl IntoIterator<Item = S>) -> Self {
        self.record.includes.extend(includes.into_iter().map(Into::into));
        self
    }

    pub fn include_code_parameters_h(mut self, yes: bool) -> Self {
        self.record.include_code_parameters_h = yes;
        self
    }

    pub fn body(mut self, body: KernelBody) -> Self {
        self.record.body = body;
        self
    }

    pub fn subdirectory(mut self, subdirectory: impl Into<String>) -> Self {
        self.record.subdirectory = subdirectory.into();
        self
    }

    pub fn desc(mut self, desc: impl Into<String>) -> Self {
        self.record.desc = desc.into();
        self
    }

    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.record.tags.insert(key.into(), value.into());
        self
    }

    pub fn build(self) -> Result<KernelRecord> {
        if !is_c_identifier(&self.record.name) {
            return Err(RegistryError::InvalidKernelName(self.record.name));
        }
        Ok(self.record)
    }
}
