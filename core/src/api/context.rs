use std::fs;
use std::path::Path;

use bumpalo::Bump;
use ecow::EcoString;
use hashbrown::HashMap;

use crate::analyzer::{self, TypeManager};
use crate::api::error::Error;
use crate::diagnostics::Diagnostics;
use crate::emitter::{self, EmitError, Program, Symbol};
use crate::lexer::Lexer;
use crate::parser;
use crate::stdlib;
use crate::vm::{ExternFn, RuntimeError, SlotIndex, Vm};

/// Compile-error callback: `(line, column, file, message)`.
pub type CompilerErrorHandler = Box<dyn Fn(usize, usize, &str, &str)>;
/// Runtime-error callback: `(message)`.
pub type RuntimeErrorHandler = Box<dyn Fn(&str)>;

/// The embedding surface: owns the VM, drives the compile pipeline, and
/// resolves names through the symbols of the last program run.
pub struct Context {
    vm: Vm,
    symbols: HashMap<EcoString, Symbol>,
    active_module: Option<String>,
    current_file: String,
    compiler_error_handler: Option<CompilerErrorHandler>,
    runtime_error_handler: Option<RuntimeErrorHandler>,
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Context {
    /// A context with the array and string builtins installed.
    pub fn new() -> Self {
        let mut vm = Vm::new();
        stdlib::install(&mut vm);

        Context {
            vm,
            symbols: HashMap::new(),
            active_module: None,
            current_file: String::new(),
            compiler_error_handler: None,
            runtime_error_handler: None,
        }
    }

    // === Compilation ===

    pub fn compile_file(&mut self, path: impl AsRef<Path>) -> Result<Program, Error> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.display().to_string(),
            source,
        })?;

        self.current_file = path.display().to_string();
        self.compile_string(&source)
    }

    pub fn compile_string(&mut self, source: &str) -> Result<Program, Error> {
        let arena = Bump::new();
        let source: &str = arena.alloc_str(source);
        let mut diagnostics = Diagnostics::new();

        let tokens = Lexer::lex(source, &mut diagnostics);
        let ast = parser::parse(&arena, &tokens, &mut diagnostics);
        if !ast.is_valid() || diagnostics.has_errors() {
            return Err(self.report_diagnostics(&diagnostics));
        }

        let types = TypeManager::new(&arena);
        let typed = analyzer::check(&arena, types, &ast, &mut diagnostics);
        if diagnostics.has_errors() {
            return Err(self.report_diagnostics(&diagnostics));
        }

        match emitter::emit(&typed) {
            Ok(program) => Ok(program),
            Err(error @ (EmitError::UnsupportedOperator { .. }
            | EmitError::UndefinedFunction { .. })) => {
                let location = error.location().unwrap_or_default();
                self.report_compiler_error(location.line, location.column, &error.to_string());
                Err(Error::Compile { count: 1 })
            }
            Err(error) => Err(error.into()),
        }
    }

    /// Render an AST dump for diagnostic output, without type checking.
    pub fn dump_ast(&mut self, source: &str) -> Result<String, Error> {
        let arena = Bump::new();
        let source: &str = arena.alloc_str(source);
        let mut diagnostics = Diagnostics::new();

        let tokens = Lexer::lex(source, &mut diagnostics);
        let ast = parser::parse(&arena, &tokens, &mut diagnostics);
        if !ast.is_valid() || diagnostics.has_errors() {
            return Err(self.report_diagnostics(&diagnostics));
        }

        Ok(parser::dump_ast(&ast))
    }

    pub fn disassemble(&self, program: &Program) -> String {
        crate::vm::disassemble(&program.ops)
    }

    // === Execution ===

    /// Execute a program's top-level code and make its symbols the active
    /// ones for `call`/`push_global`.
    pub fn run(&mut self, program: &Program, module: &str) -> Result<(), Error> {
        tracing::debug!(module, ops = program.ops.len(), "running program");
        self.symbols = program.symbols.clone();
        self.active_module = Some(module.to_string());

        self.vm
            .run_bytecode(&program.ops)
            .map_err(|error| self.report_runtime_error(error))
    }

    /// Invoke a compiled function by name. If it returns a value, the value
    /// is left in the top stack slot.
    pub fn call(&mut self, function: &str, module: &str) -> Result<(), Error> {
        let _ = module;
        if self.active_module.is_none() {
            return Err(Error::NoProgram);
        }

        let symbol = self
            .symbols
            .get(&EcoString::from(function))
            .copied()
            .ok_or_else(|| Error::UnknownSymbol(function.to_string()))?;
        let Symbol::Function { label, return_size } = symbol else {
            return Err(Error::NotAFunction(function.to_string()));
        };

        let result = (|| {
            if return_size != 0 {
                self.vm.push_bytes(return_size)?;
            }
            self.vm.call(label)
        })();
        result.map_err(|error| self.report_runtime_error(error))
    }

    /// Push a copy of a named global's value onto the stack.
    pub fn push_global(&mut self, name: &str) -> Result<(), Error> {
        let symbol = self
            .symbols
            .get(&EcoString::from(name))
            .copied()
            .ok_or_else(|| Error::UnknownSymbol(name.to_string()))?;
        let Symbol::Global { slot, .. } = symbol else {
            return Err(Error::NotAGlobal(name.to_string()));
        };

        self.vm
            .dup(SlotIndex::from(slot))
            .map_err(|error| self.report_runtime_error(error))
    }

    /// Pop `count` slots off the stack.
    pub fn pop(&mut self, count: usize) -> Result<(), Error> {
        for _ in 0..count {
            self.vm.pop()?;
        }
        Ok(())
    }

    // === Typed reads ===

    pub fn get_bool(&self, slot: i32) -> Result<bool, Error> {
        Ok(self.vm.get_bool(SlotIndex::from(slot))?)
    }

    pub fn get_char(&self, slot: i32) -> Result<i8, Error> {
        Ok(self.vm.get_char(SlotIndex::from(slot))?)
    }

    pub fn get_short(&self, slot: i32) -> Result<i16, Error> {
        Ok(self.vm.get_short(SlotIndex::from(slot))?)
    }

    pub fn get_int(&self, slot: i32) -> Result<i32, Error> {
        Ok(self.vm.get_int(SlotIndex::from(slot))?)
    }

    pub fn get_long(&self, slot: i32) -> Result<i64, Error> {
        Ok(self.vm.get_long(SlotIndex::from(slot))?)
    }

    pub fn get_float(&self, slot: i32) -> Result<f32, Error> {
        Ok(self.vm.get_float(SlotIndex::from(slot))?)
    }

    pub fn get_double(&self, slot: i32) -> Result<f64, Error> {
        Ok(self.vm.get_double(SlotIndex::from(slot))?)
    }

    pub fn get_pointer(&self, slot: i32) -> Result<u64, Error> {
        Ok(self.vm.get_pointer(SlotIndex::from(slot))?)
    }

    // === Host configuration ===

    pub fn add_extern(&mut self, name: &str, f: ExternFn) {
        self.vm.add_extern(name, f);
    }

    pub fn set_compiler_error_handler(&mut self, handler: CompilerErrorHandler) {
        self.compiler_error_handler = Some(handler);
    }

    pub fn set_runtime_error_handler(&mut self, handler: RuntimeErrorHandler) {
        self.runtime_error_handler = Some(handler);
    }

    pub fn vm(&mut self) -> &mut Vm {
        &mut self.vm
    }

    // === Error reporting ===

    fn report_compiler_error(&self, line: usize, column: usize, message: &str) {
        match &self.compiler_error_handler {
            Some(handler) => handler(line, column, &self.current_file, message),
            None => eprintln!(
                "{}:{}:{}: error: {}",
                self.current_file, line, column, message
            ),
        }
    }

    fn report_diagnostics(&self, diagnostics: &Diagnostics) -> Error {
        for diagnostic in diagnostics.iter() {
            self.report_compiler_error(
                diagnostic.location.line,
                diagnostic.location.column,
                &diagnostic.message,
            );
        }
        Error::Compile {
            count: diagnostics.len(),
        }
    }

    /// Deliver a runtime fault to the installed handler and stop the VM.
    fn report_runtime_error(&mut self, error: RuntimeError) -> Error {
        let message = error.to_string();
        match &self.runtime_error_handler {
            Some(handler) => handler(&message),
            None => eprintln!("A runtime error occurred: {}", message),
        }

        self.vm.stop_execution();
        Error::Runtime(error)
    }
}
