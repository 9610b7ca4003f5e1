use ecow::EcoString;
use hashbrown::HashMap;

use crate::analyzer::typed_ast::{TypedExpr, TypedExprKind, TypedNode, TypedProgram, TypedStmt, TypedStmtKind};
use crate::analyzer::types::VarType;
use crate::emitter::{EmitError, Program, Symbol};
use crate::parser::{BinaryOp, Constant, UnaryOp};
use crate::vm::opcode::{ArithOp, CmpOp, LabelId, Op, OpCode, Scalar, SlotIndex, StoreBytes};

/// Lower a type-checked program to bytecode.
pub fn emit(program: &TypedProgram<'_>) -> Result<Program, EmitError> {
    let mut emitter = Emitter {
        ops: Vec::new(),
        slot_count: 0,
        label_count: 0,
        constants: HashMap::new(),
        globals: HashMap::new(),
        functions: HashMap::new(),
        frames: Vec::new(),
        loops: Vec::new(),
        symbols: HashMap::new(),
    };

    emitter.assign_function_labels(&program.nodes);

    // Pass 1: intern every constant into a read-only slot.
    for node in &program.nodes {
        emitter.intern_node_constants(*node);
    }

    // Pass 2: code generation.
    for node in &program.nodes {
        emitter.emit_node(*node)?;
    }

    tracing::debug!(ops = emitter.ops.len(), labels = emitter.label_count, "emitted program");
    Ok(Program {
        ops: emitter.ops,
        symbols: emitter.symbols,
    })
}

/// The numeric type tag an operation on `ty` dispatches over.
fn scalar_of(ty: &VarType<'_>) -> Option<Scalar> {
    Some(match ty {
        VarType::Bool => Scalar::I8,
        VarType::Char { signed: true } => Scalar::I8,
        VarType::Char { signed: false } => Scalar::U8,
        VarType::Short { signed: true } => Scalar::I16,
        VarType::Short { signed: false } => Scalar::U16,
        VarType::Int { signed: true } => Scalar::I32,
        VarType::Int { signed: false } => Scalar::U32,
        VarType::Long { signed: true } => Scalar::I64,
        VarType::Long { signed: false } => Scalar::U64,
        VarType::Float => Scalar::F32,
        VarType::Double => Scalar::F64,
        _ => return None,
    })
}

fn constant_bytes(constant: &Constant<'_>) -> StoreBytes {
    match constant {
        Constant::Bool(v) => StoreBytes::from_slice(&[*v as u8]),
        Constant::Char(v) => StoreBytes::from_slice(&v.to_ne_bytes()),
        Constant::Int { value, .. } => StoreBytes::from_slice(&value.to_ne_bytes()),
        Constant::Long { value, .. } => StoreBytes::from_slice(&value.to_ne_bytes()),
        Constant::Float(v) => StoreBytes::from_slice(&v.to_ne_bytes()),
        Constant::Double(v) => StoreBytes::from_slice(&v.to_ne_bytes()),
        Constant::Str(v) => StoreBytes::from_slice(v.as_bytes()),
    }
}

/// A slot as the emitter sees it: `relative` indices count within the
/// current compile-time frame chain and translate to the runtime's negative
/// top-relative form; absolute indices address globals from the stack base.
#[derive(Debug, Clone, Copy)]
struct CompileSlot {
    slot: SlotIndex,
    relative: bool,
}

impl CompileSlot {
    fn absolute(slot: i32) -> Self {
        CompileSlot {
            slot: SlotIndex::from(slot),
            relative: false,
        }
    }

    fn relative(slot: i32) -> Self {
        CompileSlot {
            slot: SlotIndex::from(slot),
            relative: true,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct SlotDecl {
    index: i32,
    size: usize,
}

#[derive(Debug, Clone, Copy)]
struct FuncDecl {
    label: Option<LabelId>,
    return_size: usize,
}

struct CompileFrame<'a> {
    slot_count: usize,
    symbols: HashMap<&'a str, SlotDecl>,
    /// Whether this frame mirrors a runtime `PushStackFrame`.
    is_runtime: bool,
}

struct LoopContext {
    continue_label: LabelId,
    break_label: LabelId,
    /// Runtime frame depth at the loop's iteration frame, used by
    /// break/continue to pop any frames opened since.
    frame_depth: usize,
}

struct Emitter<'a> {
    ops: Vec<OpCode>,
    /// Global (top-level) slot count.
    slot_count: usize,
    label_count: LabelId,
    /// Interned constants keyed by typed-node identity.
    constants: HashMap<*const TypedExpr<'a>, CompileSlot>,
    globals: HashMap<&'a str, SlotDecl>,
    functions: HashMap<&'a str, FuncDecl>,
    frames: Vec<CompileFrame<'a>>,
    loops: Vec<LoopContext>,
    symbols: HashMap<EcoString, Symbol>,
}

impl<'a> Emitter<'a> {
    // === Bookkeeping ===

    fn push_op(&mut self, op: Op) {
        self.ops.push(OpCode::new(op));
    }

    fn push_op_debug(&mut self, op: Op, debug: impl Into<EcoString>) {
        self.ops.push(OpCode::with_debug(op, debug));
    }

    fn alloc_label(&mut self) -> LabelId {
        let label = self.label_count;
        self.label_count += 1;
        label
    }

    fn place_label(&mut self, id: LabelId, debug: impl Into<EcoString>) {
        self.push_op_debug(Op::Label { id }, debug);
    }

    fn current_count(&self) -> usize {
        self.frames
            .last()
            .map(|frame| frame.slot_count)
            .unwrap_or(self.slot_count)
    }

    fn increment_slot_count(&mut self) {
        match self.frames.last_mut() {
            Some(frame) => frame.slot_count += 1,
            None => self.slot_count += 1,
        }
    }

    /// The slot holding the most recently pushed value.
    fn top_slot(&self) -> CompileSlot {
        let count = self.current_count() as i32;
        if self.frames.is_empty() {
            CompileSlot::absolute(count)
        } else {
            CompileSlot::relative(count)
        }
    }

    fn to_runtime(&self, slot: CompileSlot) -> SlotIndex {
        if slot.relative {
            SlotIndex::new(
                slot.slot.slot - self.current_count() as i32 - 1,
                slot.slot.offset,
                slot.slot.size,
            )
        } else {
            slot.slot
        }
    }

    /// Open a compile frame; `runtime` frames also emit `PushStackFrame`.
    fn push_frame(&mut self, runtime: bool) {
        if runtime {
            self.push_op(Op::PushStackFrame);
        }
        let slot_count = self.frames.last().map(|f| f.slot_count).unwrap_or(0);
        self.frames.push(CompileFrame {
            slot_count,
            symbols: HashMap::new(),
            is_runtime: runtime,
        });
    }

    fn pop_frame(&mut self) {
        self.frames.pop();
    }

    fn runtime_frame_depth(&self) -> usize {
        self.frames.iter().filter(|frame| frame.is_runtime).count()
    }

    fn lookup_var(&self, name: &str) -> Option<CompileSlot> {
        for frame in self.frames.iter().rev() {
            if let Some(decl) = frame.symbols.get(name) {
                return Some(CompileSlot::relative(decl.index));
            }
        }
        self.globals
            .get(name)
            .map(|decl| CompileSlot::absolute(decl.index))
    }

    // === Label prepass ===

    /// Assign a label to every function and method ahead of code
    /// generation, so calls may reference definitions that come later.
    fn assign_function_labels(&mut self, nodes: &[TypedNode<'a>]) {
        for node in nodes {
            if let TypedNode::Stmt(stmt) = node {
                self.assign_stmt_labels(stmt);
            }
        }
    }

    fn assign_stmt_labels(&mut self, stmt: &TypedStmt<'a>) {
        match &stmt.kind {
            TypedStmtKind::Function {
                name,
                return_ty,
                body,
                is_extern,
                ..
            } => {
                let label = if body.is_some() {
                    Some(self.alloc_label())
                } else {
                    None
                };
                self.functions.insert(
                    *name,
                    FuncDecl {
                        label,
                        return_size: return_ty.size(),
                    },
                );
                if let Some(label) = label
                    && !is_extern
                {
                    self.symbols.insert(
                        EcoString::from(*name),
                        Symbol::Function {
                            label,
                            return_size: return_ty.size(),
                        },
                    );
                }
            }
            TypedStmtKind::Struct { methods, .. } => {
                for method in *methods {
                    self.assign_stmt_labels(method);
                }
            }
            TypedStmtKind::Compound { nodes } => self.assign_function_labels(nodes),
            TypedStmtKind::While { body, .. } | TypedStmtKind::DoWhile { body, .. } => {
                self.assign_stmt_labels(body)
            }
            TypedStmtKind::For { prologue, body, .. } => {
                self.assign_stmt_labels(prologue);
                self.assign_stmt_labels(body);
            }
            TypedStmtKind::If {
                body, else_body, ..
            } => {
                self.assign_stmt_labels(body);
                if let Some(else_body) = else_body {
                    self.assign_stmt_labels(else_body);
                }
            }
            _ => {}
        }
    }

    // === Pass 1: constant interning ===

    fn intern_node_constants(&mut self, node: TypedNode<'a>) {
        match node {
            TypedNode::Expr(expr) => self.intern_expr_constants(expr),
            TypedNode::Stmt(stmt) => self.intern_stmt_constants(stmt),
        }
    }

    fn intern_expr_constants(&mut self, expr: &'a TypedExpr<'a>) {
        match &expr.kind {
            TypedExprKind::Constant(constant) => {
                let bytes = constant_bytes(constant);
                let is_string = matches!(constant, Constant::Str(_));

                self.push_op(Op::PushBytes { bytes: bytes.len() });
                self.increment_slot_count();

                let store = if is_string {
                    Op::StoreString {
                        slot: SlotIndex::from(-1),
                        bytes,
                        set_read_only: true,
                    }
                } else {
                    Op::Store {
                        slot: SlotIndex::from(-1),
                        bytes,
                        set_read_only: true,
                    }
                };
                self.push_op(store);

                self.constants.insert(
                    expr as *const _,
                    CompileSlot::absolute(self.slot_count as i32),
                );
            }
            TypedExprKind::ArrayAccess { parent, index } => {
                self.intern_expr_constants(parent);
                self.intern_expr_constants(index);
            }
            TypedExprKind::Member { parent, .. } => self.intern_expr_constants(parent),
            TypedExprKind::Call { args, .. } => {
                for arg in *args {
                    self.intern_expr_constants(arg);
                }
            }
            TypedExprKind::Paren { inner }
            | TypedExprKind::Cast { inner, .. }
            | TypedExprKind::Unary { inner, .. } => self.intern_expr_constants(inner),
            TypedExprKind::Binary { lhs, rhs, .. } => {
                self.intern_expr_constants(lhs);
                self.intern_expr_constants(rhs);
            }
            TypedExprKind::VarRef { .. } => {}
        }
    }

    fn intern_stmt_constants(&mut self, stmt: &'a TypedStmt<'a>) {
        match &stmt.kind {
            TypedStmtKind::Compound { nodes } => {
                for node in *nodes {
                    self.intern_node_constants(*node);
                }
            }
            TypedStmtKind::VarDecl { init, .. } => {
                if let Some(init) = init {
                    self.intern_expr_constants(init);
                }
            }
            TypedStmtKind::Function { body, .. } => {
                if let Some(body) = body {
                    self.intern_stmt_constants(body);
                }
            }
            TypedStmtKind::Struct { methods, .. } => {
                for method in *methods {
                    self.intern_stmt_constants(method);
                }
            }
            TypedStmtKind::While { cond, body } => {
                self.intern_expr_constants(cond);
                self.intern_stmt_constants(body);
            }
            TypedStmtKind::DoWhile { body, cond } => {
                self.intern_stmt_constants(body);
                self.intern_expr_constants(cond);
            }
            TypedStmtKind::For {
                prologue,
                cond,
                epilogue,
                body,
            } => {
                self.intern_stmt_constants(prologue);
                self.intern_expr_constants(cond);
                self.intern_expr_constants(epilogue);
                self.intern_stmt_constants(body);
            }
            TypedStmtKind::If {
                cond,
                body,
                else_body,
            } => {
                self.intern_expr_constants(cond);
                self.intern_stmt_constants(body);
                if let Some(else_body) = else_body {
                    self.intern_stmt_constants(else_body);
                }
            }
            TypedStmtKind::Return { value } => self.intern_expr_constants(value),
            TypedStmtKind::ParamDecl { .. }
            | TypedStmtKind::Break
            | TypedStmtKind::Continue => {}
        }
    }

    // === Pass 2: code generation ===

    fn emit_node(&mut self, node: TypedNode<'a>) -> Result<(), EmitError> {
        match node {
            TypedNode::Stmt(stmt) => self.emit_stmt(stmt),
            TypedNode::Expr(expr) => self.emit_expr(expr).map(|_| ()),
        }
    }

    fn emit_compound_children(&mut self, stmt: &'a TypedStmt<'a>) -> Result<(), EmitError> {
        let TypedStmtKind::Compound { nodes } = &stmt.kind else {
            return Err(EmitError::Internal {
                message: "expected a compound statement",
            });
        };
        for node in *nodes {
            self.emit_node(*node)?;
        }
        Ok(())
    }

    fn emit_stmt(&mut self, stmt: &'a TypedStmt<'a>) -> Result<(), EmitError> {
        match &stmt.kind {
            TypedStmtKind::Compound { .. } => {
                self.push_frame(true);
                self.emit_compound_children(stmt)?;
                self.push_op(Op::PopStackFrame);
                self.pop_frame();
                Ok(())
            }
            TypedStmtKind::VarDecl { name, ty, init } => self.emit_var_decl(name, ty, *init),
            TypedStmtKind::ParamDecl { .. } => Err(EmitError::Internal {
                message: "parameter outside of a function prologue",
            }),
            TypedStmtKind::Function {
                name,
                params,
                return_ty,
                body,
                ..
            } => self.emit_function(name, params, return_ty, *body),
            TypedStmtKind::Struct { methods, .. } => {
                for method in *methods {
                    self.emit_stmt(method)?;
                }
                Ok(())
            }
            TypedStmtKind::While { cond, body } => self.emit_while(cond, body),
            TypedStmtKind::DoWhile { body, cond } => self.emit_do_while(body, cond),
            TypedStmtKind::For {
                prologue,
                cond,
                epilogue,
                body,
            } => self.emit_for(prologue, cond, epilogue, body),
            TypedStmtKind::If {
                cond,
                body,
                else_body,
            } => self.emit_if(cond, body, *else_body),
            TypedStmtKind::Return { value } => self.emit_return(value),
            TypedStmtKind::Break => self.emit_loop_jump(true),
            TypedStmtKind::Continue => self.emit_loop_jump(false),
        }
    }

    fn declare_slot(&mut self, name: &'a str, size: usize) {
        self.increment_slot_count();
        match self.frames.last_mut() {
            Some(frame) => {
                let index = frame.slot_count as i32;
                frame.symbols.insert(name, SlotDecl { index, size });
            }
            None => {
                let index = self.slot_count as i32;
                self.globals.insert(name, SlotDecl { index, size });
                self.symbols.insert(
                    EcoString::from(name),
                    Symbol::Global { slot: index, size },
                );
            }
        }
    }

    fn emit_var_decl(
        &mut self,
        name: &'a str,
        ty: &VarType<'a>,
        init: Option<&'a TypedExpr<'a>>,
    ) -> Result<(), EmitError> {
        self.push_op_debug(
            Op::PushBytes { bytes: ty.size() },
            format!("Declaration of {}", name),
        );
        self.declare_slot(name, ty.size());
        let var_slot = self.top_slot();

        // `int x = v;` lowers to the declaration followed by `x = v;`.
        if let Some(init) = init {
            let value = self.emit_expr(init)?;
            self.push_op(Op::Copy {
                dst: self.to_runtime(var_slot),
                src: self.to_runtime(value),
            });
        }
        Ok(())
    }

    fn emit_function(
        &mut self,
        name: &'a str,
        params: &'a [&'a TypedStmt<'a>],
        return_ty: &VarType<'a>,
        body: Option<&'a TypedStmt<'a>>,
    ) -> Result<(), EmitError> {
        let Some(body) = body else {
            // Extern and forward declarations emit no code.
            return Ok(());
        };

        let label = self
            .functions
            .get(name)
            .and_then(|decl| decl.label)
            .ok_or(EmitError::Internal {
                message: "function label was not pre-assigned",
            })?;
        self.place_label(label, name);

        self.push_frame(false);

        let return_slot = usize::from(return_ty.size() != 0);
        let param_count = params.len();

        // Copy arguments (sitting below the frame, under the reserved
        // return slot) into the parameter slots.
        for param in params {
            let TypedStmtKind::ParamDecl { name, ty } = &param.kind else {
                return Err(EmitError::Internal {
                    message: "function parameter is not a ParamDecl",
                });
            };
            self.push_op_debug(
                Op::PushBytes { bytes: ty.size() },
                format!("Declaration of {}", name),
            );
            self.declare_slot(name, ty.size());
            self.push_op(Op::Copy {
                dst: SlotIndex::from(-1),
                src: SlotIndex::from(-((param_count + 1 + return_slot) as i32)),
            });
        }

        self.emit_compound_children(body)?;

        if !matches!(self.ops.last(), Some(OpCode { op: Op::Ret, .. })) {
            self.push_op(Op::Ret);
        }

        self.pop_frame();
        Ok(())
    }

    fn emit_while(
        &mut self,
        cond: &'a TypedExpr<'a>,
        body: &'a TypedStmt<'a>,
    ) -> Result<(), EmitError> {
        let cond_label = self.alloc_label();
        let end_label = self.alloc_label();
        let continue_label = self.alloc_label();

        self.push_op_debug(Op::Jmp { label: cond_label }, "while loop condition");
        self.place_label(cond_label, "while loop condition");

        self.push_frame(true);
        let frame_depth = self.runtime_frame_depth();

        let cond_slot = self.emit_expr(cond)?;
        self.push_op_debug(
            Op::Jf {
                slot: self.to_runtime(cond_slot),
                label: end_label,
            },
            "while loop end",
        );

        self.loops.push(LoopContext {
            continue_label,
            break_label: end_label,
            frame_depth,
        });
        self.emit_compound_children(body)?;
        self.loops.pop();

        // The iteration frame pops on both exits of the loop so frame
        // push/pop stays balanced.
        self.push_op(Op::Jmp {
            label: continue_label,
        });
        self.place_label(continue_label, "while loop continue");
        self.push_op(Op::PopStackFrame);
        self.push_op(Op::Jmp { label: cond_label });

        self.place_label(end_label, "while loop end");
        self.push_op(Op::PopStackFrame);
        self.pop_frame();
        Ok(())
    }

    fn emit_do_while(
        &mut self,
        body: &'a TypedStmt<'a>,
        cond: &'a TypedExpr<'a>,
    ) -> Result<(), EmitError> {
        let start_label = self.alloc_label();
        let continue_label = self.alloc_label();
        let end_label = self.alloc_label();

        self.push_op_debug(Op::Jmp { label: start_label }, "do while body");
        self.place_label(start_label, "do while body");

        self.push_frame(true);
        let frame_depth = self.runtime_frame_depth();

        self.loops.push(LoopContext {
            continue_label,
            break_label: end_label,
            frame_depth,
        });
        self.emit_compound_children(body)?;
        self.loops.pop();

        self.push_op(Op::Jmp {
            label: continue_label,
        });
        self.place_label(continue_label, "do while condition");
        let cond_slot = self.emit_expr(cond)?;
        self.push_op_debug(
            Op::Jf {
                slot: self.to_runtime(cond_slot),
                label: end_label,
            },
            "do while end",
        );
        self.push_op(Op::PopStackFrame);
        self.push_op(Op::Jmp { label: start_label });

        self.place_label(end_label, "do while end");
        self.push_op(Op::PopStackFrame);
        self.pop_frame();
        Ok(())
    }

    fn emit_for(
        &mut self,
        prologue: &'a TypedStmt<'a>,
        cond: &'a TypedExpr<'a>,
        epilogue: &'a TypedExpr<'a>,
        body: &'a TypedStmt<'a>,
    ) -> Result<(), EmitError> {
        // The prologue variable lives in an enclosing frame for the whole
        // loop.
        self.push_frame(true);
        self.emit_stmt(prologue)?;

        let cond_label = self.alloc_label();
        let end_label = self.alloc_label();
        let continue_label = self.alloc_label();

        self.push_op_debug(Op::Jmp { label: cond_label }, "for loop condition");
        self.place_label(cond_label, "for loop condition");

        self.push_frame(true);
        let frame_depth = self.runtime_frame_depth();

        let cond_slot = self.emit_expr(cond)?;
        self.push_op_debug(
            Op::Jf {
                slot: self.to_runtime(cond_slot),
                label: end_label,
            },
            "for loop end",
        );

        self.loops.push(LoopContext {
            continue_label,
            break_label: end_label,
            frame_depth,
        });
        self.emit_compound_children(body)?;
        self.loops.pop();

        self.push_op(Op::Jmp {
            label: continue_label,
        });
        self.place_label(continue_label, "for loop epilogue");
        self.emit_expr(epilogue)?;
        self.push_op(Op::PopStackFrame);
        self.push_op(Op::Jmp { label: cond_label });

        self.place_label(end_label, "for loop end");
        self.push_op(Op::PopStackFrame);
        self.pop_frame();

        self.push_op(Op::PopStackFrame);
        self.pop_frame();
        Ok(())
    }

    fn emit_if(
        &mut self,
        cond: &'a TypedExpr<'a>,
        body: &'a TypedStmt<'a>,
        else_body: Option<&'a TypedStmt<'a>>,
    ) -> Result<(), EmitError> {
        self.push_frame(true);

        let cond_slot = self.emit_expr(cond)?;
        let cond_slot = self.to_runtime(cond_slot);

        let if_label = self.alloc_label();
        let else_label = else_body.map(|_| self.alloc_label());
        let after_label = self.alloc_label();

        self.push_op(Op::Jt {
            slot: cond_slot,
            label: if_label,
        });
        if let Some(else_label) = else_label {
            self.push_op(Op::Jf {
                slot: cond_slot,
                label: else_label,
            });
        }
        self.push_op(Op::Jmp { label: after_label });

        self.place_label(if_label, "if");
        self.emit_compound_children(body)?;
        self.push_op(Op::Jmp { label: after_label });

        if let Some(else_body) = else_body {
            // Safe: else_label was allocated together with else_body.
            let else_label = else_label.ok_or(EmitError::Internal {
                message: "missing else label",
            })?;
            self.place_label(else_label, "else");
            self.emit_compound_children(else_body)?;
            self.push_op(Op::Jmp { label: after_label });
        }

        self.place_label(after_label, "after if");
        self.push_op(Op::PopStackFrame);
        self.pop_frame();
        Ok(())
    }

    fn emit_return(&mut self, value: &'a TypedExpr<'a>) -> Result<(), EmitError> {
        if self.frames.is_empty() {
            return Err(EmitError::Internal {
                message: "return outside of a function",
            });
        }

        let value_slot = self.emit_expr(value)?;

        // The caller's reserved return slot sits just below this function's
        // frame.
        let return_slot = SlotIndex::from(-(self.current_count() as i32 + 1));
        self.push_op_debug(
            Op::Copy {
                dst: return_slot,
                src: self.to_runtime(value_slot),
            },
            "return",
        );
        self.push_op(Op::Ret);
        Ok(())
    }

    fn emit_loop_jump(&mut self, is_break: bool) -> Result<(), EmitError> {
        let Some(context) = self.loops.last() else {
            return Err(EmitError::Internal {
                message: "break or continue outside of a loop",
            });
        };
        let target = if is_break {
            context.break_label
        } else {
            context.continue_label
        };
        let frame_depth = context.frame_depth;

        // Unwind any frames opened inside the loop body before jumping; the
        // target label pops the iteration frame itself.
        let extra_frames = self.runtime_frame_depth().saturating_sub(frame_depth);
        for _ in 0..extra_frames {
            self.push_op(Op::PopStackFrame);
        }
        self.push_op_debug(
            Op::Jmp { label: target },
            if is_break { "break" } else { "continue" },
        );
        Ok(())
    }

    // === Expressions ===

    fn emit_expr(&mut self, expr: &'a TypedExpr<'a>) -> Result<CompileSlot, EmitError> {
        match &expr.kind {
            TypedExprKind::Constant(_) => self
                .constants
                .get(&(expr as *const _))
                .copied()
                .ok_or(EmitError::Internal {
                    message: "constant was not interned",
                }),

            TypedExprKind::VarRef { name } => {
                self.lookup_var(name).ok_or(EmitError::Internal {
                    message: "reference to an unresolved variable",
                })
            }

            TypedExprKind::ArrayAccess { parent, index } => {
                let parent_slot = self.emit_expr(parent)?;
                let index_slot = self.emit_expr(index)?;

                // Calling convention: array handle, index, then an
                // element-sized slot the builtin re-points at the element.
                self.push_op(Op::Dup {
                    src: self.to_runtime(parent_slot),
                });
                self.increment_slot_count();
                self.push_op(Op::Dup {
                    src: self.to_runtime(index_slot),
                });
                self.increment_slot_count();
                self.push_op(Op::PushBytes {
                    bytes: expr.ty.size(),
                });
                self.increment_slot_count();
                self.push_op(Op::CallExtern {
                    name: EcoString::from("bl__array__index__"),
                });

                Ok(self.top_slot())
            }

            TypedExprKind::Member { parent, offset, .. } => {
                let mut slot = self.emit_expr(parent)?;
                slot.slot.offset += offset;
                slot.slot.size = expr.ty.size();
                Ok(slot)
            }

            TypedExprKind::Call {
                name,
                args,
                is_extern,
            } => self.emit_call(expr, name, args, *is_extern),

            TypedExprKind::Paren { inner } => self.emit_expr(inner),

            TypedExprKind::Cast { from, inner } => {
                let value = self.emit_expr(inner)?;

                let from_scalar = scalar_of(from).ok_or(EmitError::Internal {
                    message: "cast from a non-numeric type",
                })?;
                let to_scalar = scalar_of(expr.ty).ok_or(EmitError::Internal {
                    message: "cast to a non-numeric type",
                })?;

                self.push_op(Op::Cast {
                    from: from_scalar,
                    to: to_scalar,
                    value: self.to_runtime(value),
                });
                self.increment_slot_count();
                Ok(self.top_slot())
            }

            TypedExprKind::Unary { op, inner } => match op {
                UnaryOp::Negate => {
                    let value = self.emit_expr(inner)?;
                    let ty = scalar_of(expr.ty).ok_or(EmitError::Internal {
                        message: "negate on a non-numeric type",
                    })?;
                    self.push_op(Op::Negate {
                        ty,
                        value: self.to_runtime(value),
                    });
                    self.increment_slot_count();
                    Ok(self.top_slot())
                }
                UnaryOp::Not => Err(EmitError::UnsupportedOperator {
                    op: "!",
                    location: expr.range.start,
                }),
            },

            TypedExprKind::Binary {
                op,
                lhs,
                rhs,
                operand_ty,
            } => self.emit_binary(expr, *op, lhs, rhs, operand_ty),
        }
    }

    fn emit_call(
        &mut self,
        expr: &'a TypedExpr<'a>,
        name: &'a str,
        args: &'a [&'a TypedExpr<'a>],
        is_extern: bool,
    ) -> Result<CompileSlot, EmitError> {
        let mut arg_slots = Vec::with_capacity(args.len());
        for arg in args {
            arg_slots.push(self.emit_expr(arg)?);
        }

        for slot in arg_slots {
            self.push_op(Op::Dup {
                src: self.to_runtime(slot),
            });
            self.increment_slot_count();
        }

        let return_size = expr.ty.size();
        if return_size != 0 {
            self.push_op_debug(Op::PushBytes { bytes: return_size }, "return slot");
            self.increment_slot_count();
        }

        if is_extern {
            self.push_op(Op::CallExtern {
                name: EcoString::from(name),
            });
        } else {
            let label = self.functions.get(name).and_then(|decl| decl.label);
            let Some(label) = label else {
                return Err(EmitError::UndefinedFunction {
                    name: name.to_string(),
                    location: expr.range.start,
                });
            };
            self.push_op(Op::Call { label });
        }

        Ok(self.top_slot())
    }

    fn emit_binary(
        &mut self,
        expr: &'a TypedExpr<'a>,
        op: BinaryOp,
        lhs: &'a TypedExpr<'a>,
        rhs: &'a TypedExpr<'a>,
        operand_ty: &VarType<'a>,
    ) -> Result<CompileSlot, EmitError> {
        let rhs_slot = self.emit_expr(rhs)?;
        let lhs_slot = self.emit_expr(lhs)?;

        if op == BinaryOp::Assign {
            self.push_op(Op::Copy {
                dst: self.to_runtime(lhs_slot),
                src: self.to_runtime(rhs_slot),
            });
            return Ok(lhs_slot);
        }

        if op.is_bitwise() {
            return Err(EmitError::UnsupportedOperator {
                op: op.as_str(),
                location: expr.range.start,
            });
        }

        let ty = scalar_of(operand_ty).ok_or(EmitError::Internal {
            message: "binary operator on a non-numeric type",
        })?;
        let lhs_index = self.to_runtime(lhs_slot);
        let rhs_index = self.to_runtime(rhs_slot);

        let arith = match op {
            BinaryOp::Add | BinaryOp::AddAssign => Some(ArithOp::Add),
            BinaryOp::Sub | BinaryOp::SubAssign => Some(ArithOp::Sub),
            BinaryOp::Mul | BinaryOp::MulAssign => Some(ArithOp::Mul),
            BinaryOp::Div | BinaryOp::DivAssign => Some(ArithOp::Div),
            BinaryOp::Mod | BinaryOp::ModAssign => Some(ArithOp::Mod),
            _ => None,
        };

        if let Some(arith) = arith {
            self.push_op(Op::Arith {
                op: arith,
                ty,
                lhs: lhs_index,
                rhs: rhs_index,
            });
            self.increment_slot_count();

            if op.is_in_place() {
                // Write the result back through the left side.
                self.push_op(Op::Copy {
                    dst: self.to_runtime(lhs_slot),
                    src: SlotIndex::from(-1),
                });
                return Ok(lhs_slot);
            }
            return Ok(self.top_slot());
        }

        let cmp = match op {
            BinaryOp::Less => CmpOp::Lt,
            BinaryOp::LessOrEq => CmpOp::Lte,
            BinaryOp::Greater => CmpOp::Gt,
            BinaryOp::GreaterOrEq => CmpOp::Gte,
            BinaryOp::IsEq => CmpOp::Cmp,
            BinaryOp::IsNotEq => CmpOp::Ncmp,
            _ => {
                return Err(EmitError::Internal {
                    message: "unhandled binary operator",
                })
            }
        };

        self.push_op(Op::Cmp {
            op: cmp,
            ty,
            lhs: lhs_index,
            rhs: rhs_index,
        });
        self.increment_slot_count();
        Ok(self.top_slot())
    }
}
