//! # Interpreter
//!
//! A tree-walking evaluator over the parsed program. Scopes live in an arena
//! indexed by [`ScopeId`], so closures point at their defining scope without
//! reference cycles. A scope is dropped when it goes out of use, unless a
//! closure captured it. Captured scopes live for the rest of the run and are
//! charged to the memory limit; a finished scope stranded under a captured
//! one is recycled through a free list.
//!
//! Every loop iteration and every call passes through [`Interpreter::tick`],
//! which enforces the deadline and honours cancellation. Guards that must
//! not be swallowed by `try`/`catch` surface as [`Interrupt::Abort`].

use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use crate::ast::{BinaryOp, DeclKind, Expr, FunctionBody, FunctionDef, LogicalOp, PropKey, Stmt, UnaryOp};
use crate::config::SandboxConfig;
use crate::error::{ErrorKind, SandboxError};
use crate::value::{Closure, Value};

mod builtins;

pub use builtins::{MathFn, Native};
pub(crate) use builtins::{error_value, math_prelude};

/// Property names that would reach the host object model.
const BLOCKED_PROPERTIES: &[&str] = &[
    "__proto__",
    "constructor",
    "prototype",
    "__defineGetter__",
    "__defineSetter__",
    "__lookupGetter__",
    "__lookupSetter__",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopeId(usize);

const GLOBAL: ScopeId = ScopeId(0);

/// Rough footprint of a retained scope and of each binding in it.
const SCOPE_BYTES: usize = std::mem::size_of::<Scope>();
const BINDING_BYTES: usize = std::mem::size_of::<String>() + std::mem::size_of::<Binding>();

#[derive(Debug)]
struct Binding {
    value: Value,
    mutable: bool,
}

#[derive(Debug, Default)]
struct Scope {
    vars: HashMap<String, Binding>,
    parent: Option<ScopeId>,
    /// `var` declarations land in the nearest function scope.
    function: bool,
    captured: bool,
}

/// Why evaluation stopped early.
#[derive(Debug)]
pub(crate) enum Interrupt {
    /// A script-level `throw`; `try` can catch it.
    Throw(Value),
    /// A sandbox guard tripped; nothing in the script can catch it.
    Abort(SandboxError),
    Cancelled,
}

impl Interrupt {
    /// Uncaught throws report the thrown error's `message`.
    pub(crate) fn into_error(self) -> SandboxError {
        match self {
            Interrupt::Throw(value) => SandboxError::runtime(thrown_message(&value)),
            Interrupt::Abort(error) => error,
            Interrupt::Cancelled => SandboxError::runtime("Execution cancelled"),
        }
    }
}

fn thrown_message(value: &Value) -> String {
    if let Value::Object(object) = value
        && let Some(message) = object.borrow().get("message")
    {
        return message.to_js_string();
    }
    value.to_js_string()
}

pub(crate) type Exec<T> = Result<T, Interrupt>;

enum Flow {
    Normal,
    Return(Value),
    Break,
    Continue,
}

/// An assignable location, resolved once so `a[i++] += 1` evaluates `i++`
/// a single time.
enum Ref {
    Var(String),
    Prop(Value, String),
}

pub struct Interpreter<'c> {
    config: &'c SandboxConfig,
    scopes: Vec<Scope>,
    scope: ScopeId,
    free: Vec<ScopeId>,
    retained_bytes: usize,
    builtins: HashMap<String, Value>,
    deadline: Instant,
    cancel: Option<Arc<AtomicBool>>,
    depth: usize,
    console: Vec<String>,
}

impl<'c> Interpreter<'c> {
    pub fn new(config: &'c SandboxConfig, deadline: Instant) -> Self {
        let root = Scope {
            function: true,
            captured: true,
            ..Scope::default()
        };
        Self {
            config,
            scopes: vec![root],
            scope: GLOBAL,
            free: Vec::new(),
            retained_bytes: 0,
            builtins: HashMap::new(),
            deadline,
            cancel: None,
            depth: 0,
            console: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_cancel(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Adds a sandbox-local global. Forbidden names are refused.
    pub fn define_global(&mut self, name: &str, value: Value) -> bool {
        if self.config.is_forbidden(name) {
            log::warn!(target: "sandbox", "refusing forbidden global {name:?}");
            return false;
        }
        self.scopes[GLOBAL.0].vars.insert(
            name.to_string(),
            Binding {
                value,
                mutable: true,
            },
        );
        true
    }

    pub fn console(&self) -> &[String] {
        &self.console
    }

    pub fn take_console(&mut self) -> Vec<String> {
        std::mem::take(&mut self.console)
    }

    /// Runs `program` as a function body whose parameters are `params`.
    pub(crate) fn run(&mut self, program: &[Stmt], params: Vec<(String, Value)>) -> Exec<Value> {
        self.in_scope(true, |this| {
            for (name, value) in params {
                this.bind(name, value, true);
            }
            match this.exec_stmts(program)? {
                Flow::Return(value) => Ok(value),
                _ => Ok(Value::Undefined),
            }
        })
    }

    fn tick(&self) -> Exec<()> {
        if let Some(flag) = &self.cancel
            && flag.load(Ordering::Relaxed)
        {
            return Err(Interrupt::Cancelled);
        }
        if Instant::now() >= self.deadline {
            let limit = u64::try_from(self.config.timeout.as_millis()).unwrap_or(u64::MAX);
            return Err(Interrupt::Abort(SandboxError::timeout(limit)));
        }
        Ok(())
    }

    fn throw(&self, name: &str, message: impl Into<String>) -> Interrupt {
        Interrupt::Throw(error_value(name, message))
    }

    fn guard_size(&self, value: &Value) -> Exec<()> {
        self.guard_bytes(value.approx_size())
    }

    fn guard_bytes(&self, bytes: usize) -> Exec<()> {
        if bytes > self.config.max_memory_usage {
            return Err(Interrupt::Abort(SandboxError::new(
                ErrorKind::MemoryLimit,
                format!(
                    "Memory limit of {} bytes exceeded",
                    self.config.max_memory_usage
                ),
            )));
        }
        Ok(())
    }

    fn check_property(&self, key: &str) -> Exec<()> {
        if BLOCKED_PROPERTIES.contains(&key) {
            return Err(Interrupt::Abort(SandboxError::new(
                ErrorKind::SecurityViolation,
                format!("Access to '{key}' is not allowed"),
            )));
        }
        Ok(())
    }

    // -- scopes -----------------------------------------------------------

    fn in_scope<T>(&mut self, function: bool, f: impl FnOnce(&mut Self) -> Exec<T>) -> Exec<T> {
        let saved = self.scope;
        let fresh = Scope {
            parent: Some(saved),
            function,
            ..Scope::default()
        };
        let id = match self.free.pop() {
            Some(id) => {
                self.scopes[id.0] = fresh;
                id
            }
            None => {
                self.scopes.push(fresh);
                ScopeId(self.scopes.len() - 1)
            }
        };
        self.scope = id;
        let result = f(self);
        self.scope = saved;
        self.release(id)?;
        result
    }

    /// Retires a scope that has gone out of use.
    fn release(&mut self, id: ScopeId) -> Exec<()> {
        let top = id.0 + 1 == self.scopes.len();
        let scope = &mut self.scopes[id.0];
        if scope.captured {
            let bytes = SCOPE_BYTES + scope.vars.len() * BINDING_BYTES;
            self.retained_bytes = self.retained_bytes.saturating_add(bytes);
            return self.guard_bytes(self.retained_bytes);
        }
        if top {
            self.scopes.pop();
        } else {
            // no closure can reach an uncaptured scope, so its slot is free
            scope.vars.clear();
            scope.parent = None;
            self.free.push(id);
        }
        Ok(())
    }

    /// Like [`Self::in_scope`] but parented on a closure's defining scope.
    fn in_closure_scope<T>(
        &mut self,
        parent: ScopeId,
        f: impl FnOnce(&mut Self) -> Exec<T>,
    ) -> Exec<T> {
        let saved = self.scope;
        self.scope = parent;
        let result = self.in_scope(true, f);
        self.scope = saved;
        result
    }

    fn bind(&mut self, name: String, value: Value, mutable: bool) {
        self.scopes[self.scope.0]
            .vars
            .insert(name, Binding { value, mutable });
    }

    fn var_scope(&self) -> ScopeId {
        let mut id = self.scope;
        while !self.scopes[id.0].function {
            match self.scopes[id.0].parent {
                Some(parent) => id = parent,
                None => break,
            }
        }
        id
    }

    fn declare(&mut self, kind: DeclKind, name: &str, value: Value) -> Exec<()> {
        match kind {
            DeclKind::Var => {
                let target = self.var_scope();
                self.scopes[target.0].vars.insert(
                    name.to_string(),
                    Binding {
                        value,
                        mutable: true,
                    },
                );
            }
            DeclKind::Let | DeclKind::Const => {
                if self.scopes[self.scope.0].vars.contains_key(name) {
                    return Err(self.throw(
                        "SyntaxError",
                        format!("Identifier '{name}' has already been declared"),
                    ));
                }
                self.bind(name.to_string(), value, kind == DeclKind::Let);
            }
        }
        Ok(())
    }

    fn find(&self, name: &str) -> Option<ScopeId> {
        let mut id = Some(self.scope);
        while let Some(scope) = id {
            if self.scopes[scope.0].vars.contains_key(name) {
                return Some(scope);
            }
            id = self.scopes[scope.0].parent;
        }
        None
    }

    fn lookup(&mut self, name: &str) -> Value {
        if let Some(scope) = self.find(name)
            && let Some(binding) = self.scopes[scope.0].vars.get(name)
        {
            return binding.value.clone();
        }
        match name {
            "undefined" => Value::Undefined,
            "NaN" => Value::Number(f64::NAN),
            "Infinity" => Value::Number(f64::INFINITY),
            _ => self.builtin(name),
        }
    }

    /// Allow-listed host globals; anything else reads as `undefined`.
    fn builtin(&mut self, name: &str) -> Value {
        if !self.config.is_allowed(name) {
            log::debug!(target: "sandbox", "blocked access to global {name:?}");
            return Value::Undefined;
        }
        if let Some(value) = self.builtins.get(name) {
            return value.clone();
        }
        match builtins::global(name) {
            Some(value) => {
                self.builtins.insert(name.to_string(), value.clone());
                value
            }
            None => Value::Undefined,
        }
    }

    fn assign_var(&mut self, name: &str, value: Value) -> Exec<()> {
        if let Some(scope) = self.find(name) {
            let const_binding = self.scopes[scope.0]
                .vars
                .get(name)
                .is_some_and(|b| !b.mutable);
            if const_binding {
                return Err(self.throw(
                    "TypeError",
                    format!("Assignment to constant variable '{name}'"),
                ));
            }
            if let Some(binding) = self.scopes[scope.0].vars.get_mut(name) {
                binding.value = value;
            }
            return Ok(());
        }
        if self.config.is_forbidden(name) {
            return Err(Interrupt::Abort(SandboxError::new(
                ErrorKind::ForbiddenAccess,
                format!("Cannot assign to forbidden global '{name}'"),
            )));
        }
        if self.config.strict_mode {
            return Err(self.throw("ReferenceError", format!("{name} is not defined")));
        }
        self.scopes[GLOBAL.0].vars.insert(
            name.to_string(),
            Binding {
                value,
                mutable: true,
            },
        );
        Ok(())
    }

    fn make_closure(&mut self, def: Rc<FunctionDef>) -> Value {
        let mut id = Some(self.scope);
        while let Some(scope) = id {
            if self.scopes[scope.0].captured {
                break;
            }
            self.scopes[scope.0].captured = true;
            id = self.scopes[scope.0].parent;
        }
        Value::Function(Rc::new(Closure {
            def,
            scope: self.scope,
        }))
    }

    // -- statements -------------------------------------------------------

    fn exec_stmts(&mut self, stmts: &[Stmt]) -> Exec<Flow> {
        for stmt in stmts {
            if let Stmt::Function(def) = stmt
                && let Some(name) = &def.name
            {
                let closure = self.make_closure(def.clone());
                self.declare(DeclKind::Var, name, closure)?;
            }
        }
        for stmt in stmts {
            match self.exec(stmt)? {
                Flow::Normal => {}
                flow => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_block(&mut self, stmts: &[Stmt]) -> Exec<Flow> {
        self.in_scope(false, |this| this.exec_stmts(stmts))
    }

    fn exec(&mut self, stmt: &Stmt) -> Exec<Flow> {
        match stmt {
            Stmt::Expr(expr) => {
                self.eval(expr)?;
                Ok(Flow::Normal)
            }
            Stmt::Decl { kind, bindings } => {
                for (name, init) in bindings {
                    let value = match init {
                        Some(expr) => self.eval(expr)?,
                        None => Value::Undefined,
                    };
                    self.declare(*kind, name, value)?;
                }
                Ok(Flow::Normal)
            }
            Stmt::Function(_) | Stmt::Empty => Ok(Flow::Normal),
            Stmt::Return(value) => {
                let value = match value {
                    Some(expr) => self.eval(expr)?,
                    None => Value::Undefined,
                };
                Ok(Flow::Return(value))
            }
            Stmt::If {
                test,
                then,
                otherwise,
            } => {
                if self.eval(test)?.truthy() {
                    self.exec(then)
                } else if let Some(otherwise) = otherwise {
                    self.exec(otherwise)
                } else {
                    Ok(Flow::Normal)
                }
            }
            Stmt::While { test, body } => loop {
                self.tick()?;
                if !self.eval(test)?.truthy() {
                    return Ok(Flow::Normal);
                }
                match self.exec(body)? {
                    Flow::Break => return Ok(Flow::Normal),
                    Flow::Return(value) => return Ok(Flow::Return(value)),
                    Flow::Normal | Flow::Continue => {}
                }
            },
            Stmt::For {
                init,
                test,
                update,
                body,
            } => self.in_scope(false, |this| {
                if let Some(init) = init {
                    this.exec(init)?;
                }
                loop {
                    this.tick()?;
                    if let Some(test) = test
                        && !this.eval(test)?.truthy()
                    {
                        return Ok(Flow::Normal);
                    }
                    match this.exec(body)? {
                        Flow::Break => return Ok(Flow::Normal),
                        Flow::Return(value) => return Ok(Flow::Return(value)),
                        Flow::Normal | Flow::Continue => {}
                    }
                    if let Some(update) = update {
                        this.eval(update)?;
                    }
                }
            }),
            Stmt::ForOf {
                kind,
                name,
                iterable,
                body,
            } => {
                let items = match self.eval(iterable)? {
                    Value::Array(items) => items.borrow().clone(),
                    Value::Str(s) => s.chars().map(|c| Value::str(c.to_string())).collect(),
                    other => {
                        return Err(self.throw(
                            "TypeError",
                            format!("{} is not iterable", other.to_js_string()),
                        ));
                    }
                };
                for item in items {
                    self.tick()?;
                    let flow = self.in_scope(false, |this| {
                        this.declare(*kind, name, item)?;
                        this.exec(body)
                    })?;
                    match flow {
                        Flow::Break => break,
                        Flow::Return(value) => return Ok(Flow::Return(value)),
                        Flow::Normal | Flow::Continue => {}
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::Block(stmts) => self.exec_block(stmts),
            Stmt::Throw(expr) => {
                let value = self.eval(expr)?;
                Err(Interrupt::Throw(value))
            }
            Stmt::Try {
                block,
                param,
                handler,
                finalizer,
            } => {
                let result = match (self.exec_block(block), handler) {
                    (Err(Interrupt::Throw(value)), Some(handler)) => {
                        self.in_scope(false, |this| {
                            if let Some(param) = param {
                                this.declare(DeclKind::Let, param, value)?;
                            }
                            this.exec_stmts(handler)
                        })
                    }
                    (other, _) => other,
                };
                if let Some(finalizer) = finalizer {
                    // guards keep propagating even through `finally`
                    if let Err(Interrupt::Abort(_) | Interrupt::Cancelled) = result {
                        return result;
                    }
                    match self.exec_block(finalizer)? {
                        Flow::Normal => {}
                        flow => return Ok(flow),
                    }
                }
                result
            }
            Stmt::Break => Ok(Flow::Break),
            Stmt::Continue => Ok(Flow::Continue),
        }
    }

    // -- expressions ------------------------------------------------------

    fn eval(&mut self, expr: &Expr) -> Exec<Value> {
        match expr {
            Expr::Number(n) => Ok(Value::Number(*n)),
            Expr::Str(s) => Ok(Value::str(s.as_str())),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Null => Ok(Value::Null),
            Expr::Ident(name) => Ok(self.lookup(name)),
            Expr::Array(items) => {
                let items = self.eval_list(items)?;
                let array = Value::array(items);
                self.guard_size(&array)?;
                Ok(array)
            }
            Expr::Object(props) => {
                let mut object = crate::value::Object::default();
                for (key, value) in props {
                    self.check_property(key)?;
                    let value = self.eval(value)?;
                    object.set(key.as_str(), value);
                }
                Ok(Value::object(object))
            }
            Expr::Unary(op, operand) => {
                let value = self.eval(operand)?;
                Ok(match op {
                    UnaryOp::Neg => Value::Number(-value.to_number()),
                    UnaryOp::Plus => Value::Number(value.to_number()),
                    UnaryOp::Not => Value::Bool(!value.truthy()),
                    UnaryOp::Typeof => Value::str(value.type_of()),
                })
            }
            Expr::Binary(op, left, right) => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                self.binary(*op, left, right)
            }
            Expr::Logical(op, left, right) => {
                let left = self.eval(left)?;
                let short_circuit = match op {
                    LogicalOp::And => !left.truthy(),
                    LogicalOp::Or => left.truthy(),
                    LogicalOp::Nullish => !left.is_nullish(),
                };
                if short_circuit {
                    Ok(left)
                } else {
                    self.eval(right)
                }
            }
            Expr::Conditional(test, then, otherwise) => {
                if self.eval(test)?.truthy() {
                    self.eval(then)
                } else {
                    self.eval(otherwise)
                }
            }
            Expr::Assign { target, op, value } => {
                let place = self.reference(target)?;
                let value = match op {
                    None => self.eval(value)?,
                    Some(op) => {
                        let current = self.get_ref(&place)?;
                        let rhs = self.eval(value)?;
                        self.binary(*op, current, rhs)?
                    }
                };
                self.put_ref(place, value.clone())?;
                Ok(value)
            }
            Expr::Update {
                target,
                increment,
                prefix,
            } => {
                let place = self.reference(target)?;
                let old = self.get_ref(&place)?.to_number();
                let new = if *increment { old + 1.0 } else { old - 1.0 };
                self.put_ref(place, Value::Number(new))?;
                Ok(Value::Number(if *prefix { new } else { old }))
            }
            Expr::Member { object, property } => {
                let object = self.eval(object)?;
                let key = self.prop_key(property)?;
                self.get_property(&object, &key)
            }
            Expr::Call { callee, args } => {
                if let Expr::Member { object, property } = callee.as_ref() {
                    let receiver = self.eval(object)?;
                    let key = self.prop_key(property)?;
                    let args = self.eval_list(args)?;
                    return self.call_method(receiver, &key, args);
                }
                let function = self.eval(callee)?;
                let args = self.eval_list(args)?;
                self.call_value(&function, args, &describe(callee))
            }
            Expr::New { callee, args } => {
                let constructor = self.eval(callee)?;
                let args = self.eval_list(args)?;
                match constructor {
                    Value::Native(native) if native.is_constructor() => {
                        builtins::call_native(self, native, args)
                    }
                    _ => Err(self.throw(
                        "TypeError",
                        format!("{} is not a constructor", describe(callee)),
                    )),
                }
            }
            Expr::Function(def) => Ok(self.make_closure(def.clone())),
        }
    }

    fn eval_list(&mut self, exprs: &[Expr]) -> Exec<Vec<Value>> {
        exprs.iter().map(|e| self.eval(e)).collect()
    }

    fn prop_key(&mut self, property: &PropKey) -> Exec<String> {
        match property {
            PropKey::Named(name) => Ok(name.clone()),
            PropKey::Computed(expr) => Ok(self.eval(expr)?.to_js_string()),
        }
    }

    fn binary(&mut self, op: BinaryOp, left: Value, right: Value) -> Exec<Value> {
        let number = |f: fn(f64, f64) -> f64| Value::Number(f(left.to_number(), right.to_number()));
        Ok(match op {
            BinaryOp::Add => {
                let concat = !matches!(
                    (&left, &right),
                    (
                        Value::Undefined | Value::Null | Value::Bool(_) | Value::Number(_),
                        Value::Undefined | Value::Null | Value::Bool(_) | Value::Number(_)
                    )
                );
                if concat {
                    let left = left.to_js_string();
                    let right = right.to_js_string();
                    self.guard_bytes(left.len() + right.len())?;
                    Value::str(left + &right)
                } else {
                    number(|a, b| a + b)
                }
            }
            BinaryOp::Sub => number(|a, b| a - b),
            BinaryOp::Mul => number(|a, b| a * b),
            BinaryOp::Div => number(|a, b| a / b),
            BinaryOp::Rem => number(|a, b| a % b),
            BinaryOp::Pow => number(f64::powf),
            BinaryOp::Eq => Value::Bool(left.loose_equals(&right)),
            BinaryOp::NotEq => Value::Bool(!left.loose_equals(&right)),
            BinaryOp::StrictEq => Value::Bool(left.strict_equals(&right)),
            BinaryOp::StrictNotEq => Value::Bool(!left.strict_equals(&right)),
            BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq => {
                let ordering = match (&left, &right) {
                    (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
                    _ => left.to_number().partial_cmp(&right.to_number()),
                };
                Value::Bool(ordering.is_some_and(|o| match op {
                    BinaryOp::Lt => o.is_lt(),
                    BinaryOp::LtEq => o.is_le(),
                    BinaryOp::Gt => o.is_gt(),
                    _ => o.is_ge(),
                }))
            }
        })
    }

    fn reference(&mut self, target: &Expr) -> Exec<Ref> {
        match target {
            Expr::Ident(name) => Ok(Ref::Var(name.clone())),
            Expr::Member { object, property } => {
                let object = self.eval(object)?;
                let key = self.prop_key(property)?;
                Ok(Ref::Prop(object, key))
            }
            _ => Err(self.throw("SyntaxError", "Invalid assignment target")),
        }
    }

    fn get_ref(&mut self, place: &Ref) -> Exec<Value> {
        match place {
            Ref::Var(name) => Ok(self.lookup(name)),
            Ref::Prop(object, key) => self.get_property(object, key),
        }
    }

    fn put_ref(&mut self, place: Ref, value: Value) -> Exec<()> {
        match place {
            Ref::Var(name) => self.assign_var(&name, value),
            Ref::Prop(object, key) => self.set_property(&object, &key, value),
        }
    }

    fn get_property(&mut self, object: &Value, key: &str) -> Exec<Value> {
        self.check_property(key)?;
        Ok(match object {
            Value::Undefined | Value::Null => {
                return Err(self.throw(
                    "TypeError",
                    format!(
                        "Cannot read properties of {} (reading '{key}')",
                        object.to_js_string()
                    ),
                ));
            }
            Value::Str(s) => match key {
                "length" => Value::Number(s.chars().count() as f64),
                _ => array_index(key)
                    .and_then(|i| s.chars().nth(i))
                    .map_or(Value::Undefined, |c| Value::str(c.to_string())),
            },
            Value::Array(items) => match key {
                "length" => Value::Number(items.borrow().len() as f64),
                _ => array_index(key)
                    .and_then(|i| items.borrow().get(i).cloned())
                    .unwrap_or(Value::Undefined),
            },
            Value::Object(props) => props.borrow().get(key).cloned().unwrap_or(Value::Undefined),
            _ => Value::Undefined,
        })
    }

    fn set_property(&mut self, object: &Value, key: &str, value: Value) -> Exec<()> {
        self.check_property(key)?;
        match object {
            Value::Undefined | Value::Null => Err(self.throw(
                "TypeError",
                format!(
                    "Cannot set properties of {} (setting '{key}')",
                    object.to_js_string()
                ),
            )),
            Value::Array(items) => {
                let slot = match key {
                    "length" => {
                        let len = value.to_number();
                        if len < 0.0 || len.fract() != 0.0 || !len.is_finite() {
                            return Err(self.throw("RangeError", "Invalid array length"));
                        }
                        let len = len as usize;
                        self.guard_bytes(len.saturating_mul(std::mem::size_of::<Value>()))?;
                        items.borrow_mut().resize(len, Value::Undefined);
                        return Ok(());
                    }
                    _ => array_index(key),
                };
                match slot {
                    Some(index) => {
                        self.guard_bytes((index + 1).saturating_mul(std::mem::size_of::<Value>()))?;
                        let mut items = items.borrow_mut();
                        if index >= items.len() {
                            items.resize(index + 1, Value::Undefined);
                        }
                        items[index] = value;
                    }
                    None => log::debug!(target: "sandbox", "ignoring named property {key:?} on array"),
                }
                Ok(())
            }
            Value::Object(props) => {
                props.borrow_mut().set(key, value);
                Ok(())
            }
            // primitives silently drop property writes
            _ => Ok(()),
        }
    }

    fn call_method(&mut self, receiver: Value, key: &str, args: Vec<Value>) -> Exec<Value> {
        self.check_property(key)?;
        match &receiver {
            Value::Undefined | Value::Null => Err(self.throw(
                "TypeError",
                format!(
                    "Cannot read properties of {} (reading '{key}')",
                    receiver.to_js_string()
                ),
            )),
            Value::Object(props) => {
                let function = props.borrow().get(key).cloned();
                match function {
                    Some(function) => self.call_value(&function, args, key),
                    None => match builtins::call_method(self, &receiver, key, args)? {
                        Some(value) => Ok(value),
                        None => Err(self.throw("TypeError", format!("{key} is not a function"))),
                    },
                }
            }
            _ => match builtins::call_method(self, &receiver, key, args)? {
                Some(value) => Ok(value),
                None => Err(self.throw(
                    "TypeError",
                    format!("{}.{key} is not a function", receiver.type_of()),
                )),
            },
        }
    }

    pub(crate) fn call_value(&mut self, function: &Value, args: Vec<Value>, name: &str) -> Exec<Value> {
        self.tick()?;
        match function {
            Value::Function(closure) => self.call_closure(closure.clone(), args),
            Value::Native(native) => builtins::call_native(self, *native, args),
            _ => Err(self.throw("TypeError", format!("{name} is not a function"))),
        }
    }

    fn call_closure(&mut self, closure: Rc<Closure>, args: Vec<Value>) -> Exec<Value> {
        if self.depth >= self.config.max_call_stack_depth {
            return Err(Interrupt::Abort(SandboxError::new(
                ErrorKind::ResourceLimit,
                "Maximum call stack size exceeded",
            )));
        }
        self.depth += 1;
        let result = self.in_closure_scope(closure.scope, |this| {
            let mut args = args.into_iter();
            for param in &closure.def.params {
                let value = args.next().unwrap_or(Value::Undefined);
                this.bind(param.clone(), value, true);
            }
            match &closure.def.body {
                FunctionBody::Block(stmts) => match this.exec_stmts(stmts)? {
                    Flow::Return(value) => Ok(value),
                    _ => Ok(Value::Undefined),
                },
                FunctionBody::Expr(expr) => this.eval(expr),
            }
        });
        self.depth -= 1;
        result
    }
}

/// Canonical non-negative integer keys only; `"01"` and `"+1"` are names.
fn array_index(key: &str) -> Option<usize> {
    if key.is_empty() || !key.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if key.len() > 1 && key.starts_with('0') {
        return None;
    }
    key.parse().ok()
}

/// Best-effort source name of a callee for error messages.
fn describe(expr: &Expr) -> String {
    match expr {
        Expr::Ident(name) => name.clone(),
        Expr::Member {
            object,
            property: PropKey::Named(name),
        } => format!("{}.{name}", describe(object)),
        Expr::Member { object, .. } => format!("{}[...]", describe(object)),
        _ => "expression".to_string(),
    }
}
