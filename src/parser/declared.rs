//! Static collection of the names a program declares
//!
//! The snapshot extractor only reports names listed here, so the list is the
//! set of variables an author can ever see in the variables view.

use crate::parser::ast::*;
use crate::parser::parse::Parser;
use rustc_hash::FxHashSet;

/// Collect every declared name in source order, without duplicates.
///
/// Covers `var`/`let`/`const` declarators, function declaration and named
/// function expression names, and parameters (arrow functions included).
/// Top-level `return` is accepted so bare function bodies can be analysed.
/// Source that fails to parse declares nothing.
pub fn declared_names(source: &str) -> Vec<String> {
    let ast = match Parser::new(source).and_then(|p| p.allow_top_level_return().parse_program()) {
        Ok(ast) => ast,
        Err(err) => {
            tracing::debug!(%err, "declared-name analysis skipped unparsable source");
            return Vec::new();
        }
    };

    let mut collector = NameCollector {
        ast: &ast,
        seen: FxHashSet::default(),
        names: Vec::new(),
    };
    collector.visit(ast.root);
    collector.names
}

struct NameCollector<'a> {
    ast: &'a Ast,
    seen: FxHashSet<String>,
    names: Vec<String>,
}

impl NameCollector<'_> {
    fn add(&mut self, name: &str) {
        if self.seen.insert(name.to_string()) {
            self.names.push(name.to_string());
        }
    }

    fn visit_function(&mut self, def: &FunctionDef) {
        if let Some(name) = &def.name {
            self.add(name);
        }
        for param in &def.params {
            self.add(param);
        }
        self.visit(def.body);
    }

    fn visit_all(&mut self, ids: &[NodeId]) {
        for &id in ids {
            self.visit(id);
        }
    }

    fn visit(&mut self, id: NodeId) {
        let ast = self.ast;
        match ast.kind(id) {
            NodeKind::Program { body } | NodeKind::Block { body } => self.visit_all(body),
            NodeKind::ExpressionStatement { expression } => self.visit(*expression),
            NodeKind::VariableDeclaration { declarations, .. } => {
                for decl in declarations {
                    self.add(&decl.name);
                    if let Some(init) = decl.init {
                        self.visit(init);
                    }
                }
            }
            NodeKind::FunctionDeclaration(def) | NodeKind::Function(def) => {
                self.visit_function(def)
            }
            NodeKind::Return { argument } => {
                if let Some(arg) = argument {
                    self.visit(*arg);
                }
            }
            NodeKind::Throw { argument } => self.visit(*argument),
            NodeKind::If {
                test,
                consequent,
                alternate,
            } => {
                self.visit(*test);
                self.visit(*consequent);
                if let Some(alt) = alternate {
                    self.visit(*alt);
                }
            }
            NodeKind::While { test, body } => {
                self.visit(*test);
                self.visit(*body);
            }
            NodeKind::DoWhile { body, test } => {
                self.visit(*body);
                self.visit(*test);
            }
            NodeKind::For {
                init,
                test,
                update,
                body,
            } => {
                for part in [init, test, update].into_iter().flatten() {
                    self.visit(*part);
                }
                self.visit(*body);
            }
            NodeKind::Switch {
                discriminant,
                cases,
            } => {
                self.visit(*discriminant);
                for case in cases {
                    if let Some(test) = case.test {
                        self.visit(test);
                    }
                    self.visit_all(&case.consequent);
                }
            }
            NodeKind::Array { elements } => self.visit_all(elements),
            NodeKind::Object { properties } => {
                for prop in properties {
                    self.visit(prop.value);
                }
            }
            NodeKind::Unary { argument, .. } | NodeKind::Update { argument, .. } => {
                self.visit(*argument)
            }
            NodeKind::Binary { left, right, .. } | NodeKind::Logical { left, right, .. } => {
                self.visit(*left);
                self.visit(*right);
            }
            NodeKind::Conditional {
                test,
                consequent,
                alternate,
            } => {
                self.visit(*test);
                self.visit(*consequent);
                self.visit(*alternate);
            }
            NodeKind::Assign { target, value, .. } => {
                self.visit(*target);
                self.visit(*value);
            }
            NodeKind::Member { object, property } => {
                self.visit(*object);
                if let MemberProperty::Computed(index) = property {
                    self.visit(*index);
                }
            }
            NodeKind::Call { callee, arguments } => {
                self.visit(*callee);
                self.visit_all(arguments);
            }
            NodeKind::Break
            | NodeKind::Continue
            | NodeKind::Empty
            | NodeKind::Number(_)
            | NodeKind::Str(_)
            | NodeKind::Bool(_)
            | NodeKind::Null
            | NodeKind::Identifier(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_order_and_dedup() {
        let names = declared_names(
            "var total = 0;\n\
             function add(a, b) { let sum = a + b; return sum; }\n\
             var total = add(1, 2);\n\
             const sq = x => x * x;",
        );
        assert_eq!(names, vec!["total", "add", "a", "b", "sum", "sq", "x"]);
    }

    #[test]
    fn test_loop_and_switch_declarations() {
        let names = declared_names(
            "for (let i = 0; i < 3; i++) { var j = i; }\nswitch (j) { case 1: let k = 2; }",
        );
        assert_eq!(names, vec!["i", "j", "k"]);
    }

    #[test]
    fn test_bare_function_body() {
        let names = declared_names("var r = bindings.n * 2;\nreturn r;");
        assert_eq!(names, vec!["r"]);
    }

    #[test]
    fn test_parse_failure_declares_nothing() {
        assert!(declared_names("var = ;").is_empty());
    }
}
