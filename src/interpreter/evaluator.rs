use std::rc::Rc;

use tracing::{debug, trace, warn};

use crate::frontend::ast::{Node, NodeKind};
use crate::frontend::lexer::Ops;
use crate::frontend::location::SourceLocation;
use crate::interpreter::error::{BindingKind, EvalError, EvalResult};
use crate::interpreter::scope::Scope;
use crate::interpreter::stack::ensure_sufficient_stack;
use crate::interpreter::value::{Function, Value};

pub const DEFAULT_MAX_CALL_DEPTH: usize = 256;
pub const DEFAULT_MAX_NESTING_DEPTH: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvalConfig {
    pub max_call_depth: usize,
    /// Bound on nodes being evaluated at once, across calls.
    pub max_nesting_depth: usize,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            max_nesting_depth: DEFAULT_MAX_NESTING_DEPTH,
        }
    }
}

/// Walks the tree, evaluating each node against a scope.
///
/// One interpreter drives one scope tree. Errors raised by a top-level
/// statement abandon that statement only; they are collected and handed
/// back by [`Interpreter::run`].
#[derive(Debug, Default)]
pub struct Interpreter {
    config: EvalConfig,
    depth: usize,
    nesting: usize,
    errors: Vec<EvalError>,
}

fn binding_name(node: &Node) -> EvalResult<&str> {
    node.as_identifier()
        .ok_or_else(|| EvalError::UnsupportedNodeKind {
            kind: node.kind.name(),
            loc: node.loc,
        })
}

// Source-like rendering of a callee for error messages
fn describe(node: &Node) -> String {
    match &node.kind {
        NodeKind::Identifier { name } => name.clone(),
        NodeKind::MemberExpression { object, property } => {
            format!("{}.{}", describe(object), describe(property))
        }
        NodeKind::CallExpression { callee, .. } => format!("{}(...)", describe(callee)),
        other => other.name().to_string(),
    }
}

fn as_number(value: &Value, loc: SourceLocation) -> EvalResult<f64> {
    value.as_number().ok_or_else(|| EvalError::NotANumber {
        found: value.type_name(),
        loc,
    })
}

impl Interpreter {
    pub fn new(config: EvalConfig) -> Self {
        Self {
            config,
            depth: 0,
            nesting: 0,
            errors: vec![],
        }
    }

    /// Evaluates a program against `scope`, returning every error raised by
    /// its top-level statements in order.
    pub fn run(&mut self, program: &Node, scope: &Scope) -> Vec<EvalError> {
        if let Err(error) = self.evaluate(program, scope) {
            self.errors.push(error);
        }

        std::mem::take(&mut self.errors)
    }

    pub fn evaluate(&mut self, node: &Node, scope: &Scope) -> EvalResult<Value> {
        if self.nesting >= self.config.max_nesting_depth {
            return Err(EvalError::NestingTooDeep {
                limit: self.config.max_nesting_depth,
                loc: node.loc,
            });
        }

        self.nesting += 1;
        let result = ensure_sufficient_stack(|| self.evaluate_node(node, scope));
        self.nesting -= 1;

        result
    }

    fn evaluate_node(&mut self, node: &Node, scope: &Scope) -> EvalResult<Value> {
        trace!(kind = node.kind.name(), loc = %node.loc, "evaluate");

        match &node.kind {
            NodeKind::Program { body } => {
                self.run_statements(body, scope);
                Ok(Value::Undefined)
            }

            NodeKind::VariableDeclaration { declarations, .. } => {
                for declarator in declarations {
                    self.evaluate(declarator, scope)?;
                }
                Ok(Value::Undefined)
            }

            NodeKind::VariableDeclarator { id, init } => {
                let name = binding_name(id)?;
                Self::ensure_undeclared(name, BindingKind::Variable, scope, node.loc)?;

                let value = match init {
                    Some(init) => self.evaluate(init, scope)?,
                    None => Value::Undefined,
                };

                debug!(name, %value, "declare variable");
                scope.set(name, value);
                Ok(Value::Undefined)
            }

            NodeKind::BinaryExpression {
                operator,
                left,
                right,
            } => {
                let lhs = self.evaluate(left, scope)?;
                let rhs = self.evaluate(right, scope)?;

                let apply: fn(f64, f64) -> f64 = match operator {
                    Ops::Plus => |a, b| a + b,
                    Ops::Minus => |a, b| a - b,
                    Ops::Mult => |a, b| a * b,
                    Ops::Div => |a, b| a / b,
                    unsupported => {
                        return Err(EvalError::UnsupportedOperator {
                            operator: *unsupported,
                            loc: node.loc,
                        })
                    }
                };

                let lhs = as_number(&lhs, left.loc)?;
                let rhs = as_number(&rhs, right.loc)?;
                Ok(Value::Number(apply(lhs, rhs)))
            }

            // Reached only in value position; names being declared or
            // accessed as members are read through `binding_name`.
            NodeKind::Identifier { name } => Ok(self.resolve(name, scope)),

            NodeKind::NumericLiteral { value } => Ok(Value::Number(*value)),

            NodeKind::StringLiteral { .. } => Err(EvalError::UnsupportedNodeKind {
                kind: node.kind.name(),
                loc: node.loc,
            }),

            NodeKind::ExpressionStatement { expression } => self.evaluate(expression, scope),

            NodeKind::CallExpression { callee, arguments } => self.call(callee, arguments, scope),

            NodeKind::MemberExpression { object, property } => {
                let (_receiver, member) = self.member(object, property, scope)?;
                Ok(member)
            }

            NodeKind::FunctionDeclaration { id, params, body } => {
                let name = binding_name(id)?;
                Self::ensure_undeclared(name, BindingKind::Function, scope, node.loc)?;

                let function = Function {
                    name: name.to_string(),
                    params: params.clone(),
                    body: Rc::clone(body),
                    scope: scope.clone(),
                };

                debug!(name, params = ?params, "declare function");
                scope.set(name, Value::Function(Rc::new(function)));
                Ok(Value::Undefined)
            }

            NodeKind::BlockStatement { body } => self.block(body, scope),

            NodeKind::ReturnStatement { argument } => match argument {
                Some(argument) => self.evaluate(argument, scope),
                None => Ok(Value::Undefined),
            },
        }
    }

    // Each top-level statement stands alone: a failure is recorded and the
    // next statement still runs. Side effects already made are kept.
    fn run_statements(&mut self, body: &[Node], scope: &Scope) {
        for statement in body {
            if let Err(error) = self.evaluate(statement, scope) {
                warn!(%error, loc = %error.loc(), "statement failed");
                self.errors.push(error);
            }
        }
    }

    // A `return` directly inside the block ends it and supplies its value
    fn block(&mut self, body: &[Node], scope: &Scope) -> EvalResult<Value> {
        for statement in body {
            if statement.is_return() {
                return self.evaluate(statement, scope);
            }
            self.evaluate(statement, scope)?;
        }

        Ok(Value::Undefined)
    }

    fn resolve(&self, name: &str, scope: &Scope) -> Value {
        scope.get(name).unwrap_or_else(|| {
            trace!(name, "unbound name resolves to undefined");
            Value::Undefined
        })
    }

    fn ensure_undeclared(
        name: &str,
        binding: BindingKind,
        scope: &Scope,
        loc: SourceLocation,
    ) -> EvalResult<()> {
        if scope.has(name) {
            return Err(EvalError::DuplicateDeclaration {
                name: name.to_string(),
                binding,
                loc,
            });
        }
        Ok(())
    }

    // Resolves `object.property`, yielding the receiver and the member value
    fn member(
        &mut self,
        object: &Node,
        property: &Node,
        scope: &Scope,
    ) -> EvalResult<(Value, Value)> {
        let receiver = self.evaluate(object, scope)?;
        let name = binding_name(property)?;

        match &receiver {
            Value::Object(target) => {
                let member = target.get(name).unwrap_or(Value::Undefined);
                Ok((receiver, member))
            }
            other => Err(EvalError::NotAnObject {
                property: name.to_string(),
                target: other.type_name(),
                loc: property.loc,
            }),
        }
    }

    fn call(&mut self, callee: &Node, arguments: &[Node], scope: &Scope) -> EvalResult<Value> {
        let args = arguments
            .iter()
            .map(|argument| self.evaluate(argument, scope))
            .collect::<EvalResult<Vec<_>>>()?;

        let (this, function) = match &callee.kind {
            NodeKind::MemberExpression { object, property } => self.member(object, property, scope)?,
            _ => (Value::Undefined, self.evaluate(callee, scope)?),
        };

        if !function.is_callable() {
            return Err(EvalError::NotCallable {
                callee: describe(callee),
                loc: callee.loc,
            });
        }

        self.invoke(&function, this, &args, callee.loc)
    }

    /// Calls `function` with `this` bound to the receiver.
    pub fn invoke(
        &mut self,
        function: &Value,
        this: Value,
        args: &[Value],
        loc: SourceLocation,
    ) -> EvalResult<Value> {
        match function {
            Value::Function(function) => self.invoke_function(function, this, args, loc),
            Value::NativeFunction(native) => {
                debug!(function = %native.name, args = args.len(), "invoke native");
                native
                    .call(&this, args)
                    .map_err(|message| EvalError::Native {
                        function: native.name.clone(),
                        message,
                        loc,
                    })
            }
            other => Err(EvalError::NotCallable {
                callee: other.to_string(),
                loc,
            }),
        }
    }

    // The call scope hangs off the defining scope, never the caller's
    fn invoke_function(
        &mut self,
        function: &Function,
        this: Value,
        args: &[Value],
        loc: SourceLocation,
    ) -> EvalResult<Value> {
        if self.depth >= self.config.max_call_depth {
            return Err(EvalError::CallDepthExceeded {
                limit: self.config.max_call_depth,
                loc,
            });
        }

        let call_scope = Scope::child(&function.scope);
        for (index, param) in function.params.iter().enumerate() {
            let arg = args.get(index).cloned().unwrap_or(Value::Undefined);
            call_scope.set(param.as_str(), arg);
        }
        call_scope.set("this", this);

        debug!(function = %function.name, args = args.len(), depth = self.depth, "invoke");

        self.depth += 1;
        let result = self.evaluate(&function.body, &call_scope);
        self.depth -= 1;

        // Unless the result closes over it, nothing can reach the call scope
        // any more; emptying it frees functions declared inside the call.
        let escaped = matches!(&result, Ok(value) if value.captures(&call_scope));
        if !escaped {
            call_scope.release();
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::parser::parse_program;
    use crate::interpreter::builtins::{install_globals, CapturedConsole};
    use crate::interpreter::error::ErrorCategory;
    use crate::interpreter::value::Object;
    use pretty_assertions::assert_eq;

    struct Run {
        output: Vec<String>,
        errors: Vec<EvalError>,
        scope: Scope,
    }

    fn run_with(src: &str, config: EvalConfig) -> Run {
        let program = parse_program(src).expect("test source should parse");
        let sink = Rc::new(CapturedConsole::new());
        let scope = Scope::root();
        install_globals(&scope, sink.clone());

        let errors = Interpreter::new(config).run(&program, &scope);

        Run {
            output: sink.text(),
            errors,
            scope,
        }
    }

    fn run(src: &str) -> Run {
        run_with(src, EvalConfig::default())
    }

    #[test]
    fn declaration_then_call() {
        let run = run("
            const a = 1 + 2;
            function add(a, b) {
                return a + b
            }
            console.log(a);
            console.log(add(2, 2));
        ");

        assert!(run.errors.is_empty(), "unexpected errors: {:?}", run.errors);
        assert_eq!(run.output, vec!["3", "4"]);
    }

    #[test]
    fn arithmetic() {
        let run = run("
            console.log(7 - 2 * 3, 9 / 2, (1 + 2) * 3);
            console.log(1 / 0, 0 - 1 / 0);
        ");

        assert_eq!(run.output, vec!["1 4.5 9", "Infinity -Infinity"]);
    }

    #[test]
    fn references_resolve_through_enclosing_scopes() {
        let run = run("
            const x = 4;
            function twice() { return x * 2 }
            function nested() { function inner() { return x + 1 } return inner() }
            console.log(x, twice(), nested());
        ");

        assert_eq!(run.output, vec!["4 8 5"]);
    }

    #[test]
    fn redeclaration_in_same_scope_fails() {
        let run = run("
            const a = 1;
            const a = 2;
            function a() {}
            console.log(a);
        ");

        assert_eq!(run.output, vec!["1"]);
        assert_eq!(run.errors.len(), 2);
        assert!(run
            .errors
            .iter()
            .all(|error| error.category() == ErrorCategory::DuplicateDeclaration));
        assert!(matches!(
            &run.errors[1],
            EvalError::DuplicateDeclaration { name, binding: BindingKind::Function, .. } if name == "a"
        ));
    }

    #[test]
    fn inner_scopes_may_shadow() {
        let run = run("
            const a = 1;
            function f() { const a = 2; return a }
            console.log(f(), a);
        ");

        assert!(run.errors.is_empty(), "unexpected errors: {:?}", run.errors);
        assert_eq!(run.output, vec!["2 1"]);
    }

    #[test]
    fn zero_is_a_binding() {
        let run = run("
            const zero = 0;
            const zero = 1;
            console.log(zero);
        ");

        assert_eq!(run.errors.len(), 1);
        assert_eq!(run.output, vec!["0"]);
    }

    #[test]
    fn free_variables_resolve_in_defining_scope() {
        let run = run("
            const x = 10;
            function getX() { return x }
            function withLocalX(x) { return getX() }
            console.log(withLocalX(99));
        ");

        assert_eq!(run.output, vec!["10"]);
    }

    #[test]
    fn closures_keep_their_scope_alive() {
        let run = run("
            function adder(n) {
                function add(m) { return n + m }
                return add
            }
            const add5 = adder(5);
            const add1 = adder(1);
            console.log(add5(3), add1(3));
        ");

        assert!(run.errors.is_empty(), "unexpected errors: {:?}", run.errors);
        assert_eq!(run.output, vec!["8 4"]);
    }

    #[test]
    fn parameters_shadow_outer_variables() {
        let run = run("
            const a = 100;
            function add(a, b) { return a + b }
            console.log(add(1, 2), a);
        ");

        assert_eq!(run.output, vec!["3 100"]);
    }

    #[test]
    fn missing_arguments_are_undefined() {
        let run = run("
            const b = 7;
            function second(a, b) { return b }
            console.log(second(1));
            console.log(second(1, 2, 3));
        ");

        assert_eq!(run.output, vec!["undefined", "2"]);
    }

    #[test]
    fn return_stops_the_block() {
        let run = run("
            function f() {
                console.log(1);
                return 2;
                console.log(3);
            }
            console.log(f());
        ");

        assert_eq!(run.output, vec!["1", "2"]);
    }

    #[test]
    fn return_ends_only_its_own_block() {
        let run = run("
            function f() {
                { return 1 }
                return 2
            }
            function g() { console.log(0) }
            console.log(f(), g());
        ");

        assert_eq!(run.output, vec!["0", "2 undefined"]);
    }

    #[test]
    fn unsupported_operator_fails_only_its_statement() {
        let run = run("
            const a = 5 % 2;
            console.log(1);
            console.log(a);
        ");

        assert_eq!(run.output, vec!["1", "undefined"]);
        assert!(matches!(
            run.errors.as_slice(),
            [EvalError::UnsupportedOperator { operator: Ops::Mod, .. }]
        ));
        assert_eq!(run.errors[0].category(), ErrorCategory::UnsupportedConstruct);
        assert_eq!(run.errors[0].loc(), SourceLocation::of(2, 22, 2, 27));
    }

    #[test]
    fn unsupported_node_kind_is_reported() {
        let run = run("console.log('hi');\nconsole.log(2);");

        assert_eq!(run.output, vec!["2"]);
        assert_eq!(
            run.errors,
            vec![EvalError::UnsupportedNodeKind {
                kind: "StringLiteral",
                loc: SourceLocation::of(1, 12, 1, 16),
            }]
        );
    }

    #[test]
    fn failed_declarations_keep_earlier_bindings() {
        let run = run("const a = 1, b = 1 % 2, c = 3;");

        assert_eq!(run.errors.len(), 1);
        assert_eq!(run.scope.get("a"), Some(Value::Number(1.0)));
        assert!(!run.scope.has("b"));
        assert!(!run.scope.has("c"));
    }

    #[test]
    fn calling_non_functions() {
        let run = run("
            const n = 1;
            n();
            console.warn(1);
            missing(2);
        ");

        let callees: Vec<String> = run
            .errors
            .iter()
            .map(|error| match error {
                EvalError::NotCallable { callee, .. } => callee.clone(),
                other => panic!("unexpected error {other:?}"),
            })
            .collect();
        assert_eq!(callees, vec!["n", "console.warn", "missing"]);
    }

    #[test]
    fn members_of_non_objects() {
        let run = run("const n = 1;\nn.log(2);");

        assert_eq!(
            run.errors,
            vec![EvalError::NotAnObject {
                property: "log".to_string(),
                target: "number",
                loc: SourceLocation::of(2, 2, 2, 5),
            }]
        );
    }

    #[test]
    fn arithmetic_on_non_numbers() {
        let run = run("function f() {}\nconst x = f + 1;");

        assert_eq!(
            run.errors,
            vec![EvalError::NotANumber {
                found: "function",
                loc: SourceLocation::of(2, 10, 2, 11),
            }]
        );
    }

    #[test]
    fn call_depth_is_bounded() {
        let run = run_with(
            "
            function forever() { return forever() }
            forever();
            console.log(1);
            ",
            EvalConfig {
                max_call_depth: 16,
                ..EvalConfig::default()
            },
        );

        assert_eq!(run.output, vec!["1"]);
        assert!(matches!(
            run.errors.as_slice(),
            [EvalError::CallDepthExceeded { limit: 16, .. }]
        ));
    }

    #[test]
    fn long_operator_chains_evaluate() {
        let sum = vec!["1"; 5000].join(" + ");
        let run = run(&format!("console.log({sum});\nconsole.log(2);"));

        assert!(run.errors.is_empty(), "unexpected errors: {:?}", run.errors);
        assert_eq!(run.output, vec!["5000", "2"]);
    }

    #[test]
    fn nesting_depth_is_bounded() {
        let sum = vec!["1"; 200].join(" + ");
        let run = run_with(
            &format!("const a = {sum};\nconsole.log(a);\nconsole.log(1 + 2);"),
            EvalConfig {
                max_nesting_depth: 64,
                ..EvalConfig::default()
            },
        );

        assert_eq!(run.output, vec!["undefined", "3"]);
        assert!(matches!(
            run.errors.as_slice(),
            [EvalError::NestingTooDeep { limit: 64, .. }]
        ));
        assert!(!run.scope.has("a"));
    }

    #[test]
    fn default_recursion_hits_the_call_limit_first() {
        let run = run("
            function f(n) { return 1 + f(n) }
            f(1);
        ");

        assert!(matches!(
            run.errors.as_slice(),
            [EvalError::CallDepthExceeded {
                limit: DEFAULT_MAX_CALL_DEPTH,
                ..
            }]
        ));
    }

    #[test]
    fn finished_call_scopes_are_freed() {
        let run = run("
            function outer() {
                function helper() { return 1 }
                return helper()
            }
        ");
        let before = run.scope.handle_count();

        let program = parse_program("const one = outer();").expect("test source should parse");
        let errors = Interpreter::default().run(&program, &run.scope);

        assert!(errors.is_empty(), "unexpected errors: {errors:?}");
        assert_eq!(run.scope.get("one"), Some(Value::Number(1.0)));
        assert_eq!(run.scope.handle_count(), before);
    }

    #[test]
    fn returned_closures_keep_their_call_scope() {
        let run = run("
            function counter(start) {
                function next(step) { return start + step }
                return next
            }
            const next = counter(10);
            console.log(next(1), next(2));
        ");

        assert!(run.errors.is_empty(), "unexpected errors: {:?}", run.errors);
        assert_eq!(run.output, vec!["11 12"]);
    }

    #[test]
    fn functions_display_their_name() {
        let run = run("function add(a, b) { return a + b }\nconsole.log(add, console.log);");

        assert_eq!(run.output, vec!["[Function: add] [Function: log]"]);
    }

    #[test]
    fn member_calls_bind_the_receiver() {
        let run = run("function who() { return this }");
        let who = run.scope.get("who").expect("who is declared");

        let namespace: Value = Object::new().with("who", who).into();
        run.scope.set("ns", namespace.clone());

        let program = parse_program("const viaMember = ns.who();\nconst plain = who();")
            .expect("test source should parse");
        let errors = Interpreter::default().run(&program, &run.scope);

        assert!(errors.is_empty(), "unexpected errors: {errors:?}");
        assert_eq!(run.scope.get("viaMember"), Some(namespace));
        assert_eq!(run.scope.get("plain"), Some(Value::Undefined));
    }

    #[test]
    fn native_members_receive_the_namespace() {
        let scope = Scope::root();
        let namespace: Value = Object::new()
            .with("self", Value::native("self", |this, _| Ok(this.clone())))
            .into();
        scope.set("ns", namespace.clone());

        let program = parse_program("const got = ns.self();").expect("test source should parse");
        let errors = Interpreter::default().run(&program, &scope);

        assert!(errors.is_empty(), "unexpected errors: {errors:?}");
        assert_eq!(scope.get("got"), Some(namespace));
    }

    #[test]
    fn native_failures_carry_the_call_site() {
        let scope = Scope::root();
        scope.set("fail", Value::native("fail", |_, _| Err("boom".to_string())));

        let program = parse_program("fail(1);").expect("test source should parse");
        let errors = Interpreter::default().run(&program, &scope);

        assert_eq!(
            errors,
            vec![EvalError::Native {
                function: "fail".to_string(),
                message: "boom".to_string(),
                loc: SourceLocation::of(1, 0, 1, 4),
            }]
        );
        assert_eq!(errors[0].to_string(), "fail: boom");
    }

    #[test]
    fn function_scope_is_parented_at_definition() {
        let run = run("function probe() { const local = 1; return this }");
        let Some(Value::Function(probe)) = run.scope.get("probe") else {
            panic!("probe should be a function");
        };

        assert!(probe.scope.ptr_eq(&run.scope));
        assert_eq!(probe.params, Vec::<String>::new());
        assert!(!run.scope.has("local"));
    }
}
