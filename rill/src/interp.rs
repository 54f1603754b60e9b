// interp.rs — Reference evaluator
//
// Evaluates a function on concrete argument values, one node at a time in
// dependency order. This is the behavioral oracle the optimizer is measured
// against: a rewrite is correct exactly when evaluation before and after
// agrees for every argument valuation.
//
// Runtime conventions (matched by the conservative analysis rules in
// dataflow.rs): select clamps an oversized selector to the last case,
// array_index clamps an out-of-range index to the last element,
// array_update out of range is a no-op, priority_sel takes the lowest set
// selector bit and falls back to its default.

use std::collections::HashMap;

use crate::ir::{Function, NodeId, NodeKind};
use crate::value::{mask, Value};

/// Evaluate `func` on `args` (one value per parameter, in declaration
/// order) and return the value of its return node.
///
/// This is a test oracle: argument arity/type mismatches and evaluation of
/// a function without a return node are programmer errors and panic.
pub fn eval(func: &Function, args: &[Value]) -> Value {
    let ret = func
        .return_node()
        .expect("cannot evaluate a function with no return node");
    let mut env = eval_all(func, args);
    env.remove(&ret).unwrap()
}

/// Evaluate every live node of `func` and return the full valuation.
pub fn eval_all(func: &Function, args: &[Value]) -> HashMap<NodeId, Value> {
    assert_eq!(
        args.len(),
        func.params().len(),
        "argument count mismatch for `{}`",
        func.name()
    );
    for (&p, arg) in func.params().iter().zip(args) {
        assert_eq!(
            arg.ty(),
            func.node(p).ty,
            "argument type mismatch for parameter `{}`",
            func.node(p).name
        );
    }

    let mut env: HashMap<NodeId, Value> = HashMap::new();
    for id in func.topo_order() {
        let value = eval_node(func, &env, args, id);
        env.insert(id, value);
    }
    env
}

fn eval_node(func: &Function, env: &HashMap<NodeId, Value>, args: &[Value], id: NodeId) -> Value {
    let node = func.node(id);
    let operand = |i: usize| &env[&node.operands[i]];

    match &node.kind {
        NodeKind::Param => {
            let pos = func
                .params()
                .iter()
                .position(|&p| p == id)
                .expect("param node not in parameter list");
            args[pos].clone()
        }
        NodeKind::Literal(value) => value.clone(),
        NodeKind::Identity => operand(0).clone(),
        NodeKind::Tuple => {
            Value::tuple(node.operands.iter().map(|op| env[op].clone()).collect())
        }
        NodeKind::TupleIndex(i) => match operand(0) {
            Value::Tuple(fields) => fields[*i].clone(),
            v => panic!("tuple_index of non-tuple value {v}"),
        },
        NodeKind::Array => {
            Value::array(node.operands.iter().map(|op| env[op].clone()).collect())
        }
        NodeKind::ArrayIndex => match operand(0) {
            Value::Array(elements) => {
                assert!(!elements.is_empty(), "array_index of empty array");
                let i = scalar(operand(1)).min(elements.len() as u64 - 1) as usize;
                elements[i].clone()
            }
            v => panic!("array_index of non-array value {v}"),
        },
        NodeKind::ArrayUpdate => match operand(0) {
            Value::Array(elements) => {
                let mut elements = elements.clone();
                let i = scalar(operand(2));
                if (i as usize) < elements.len() {
                    elements[i as usize] = operand(1).clone();
                }
                Value::array(elements)
            }
            v => panic!("array_update of non-array value {v}"),
        },
        NodeKind::Select => {
            let cases = &node.operands[1..];
            let i = (scalar(operand(0)) as usize).min(cases.len() - 1);
            env[&cases[i]].clone()
        }
        NodeKind::PrioritySelect => {
            let selector = scalar(operand(0));
            let cases = &node.operands[1..node.operands.len() - 1];
            let default = node.operands[node.operands.len() - 1];
            let chosen = (0..cases.len())
                .find(|i| selector & (1 << i) != 0)
                .map_or(default, |i| cases[i]);
            env[&chosen].clone()
        }
        NodeKind::Add => {
            let width = scalar_width(func, id);
            Value::bits(width, mask(width, scalar(operand(0)).wrapping_add(scalar(operand(1)))))
        }
        NodeKind::Not => {
            let width = scalar_width(func, id);
            Value::bits(width, mask(width, !scalar(operand(0))))
        }
    }
}

fn scalar(v: &Value) -> u64 {
    v.as_bits()
        .unwrap_or_else(|| panic!("expected a scalar, got {v}"))
}

fn scalar_width(func: &Function, id: NodeId) -> u32 {
    match func.node(id).ty {
        crate::ty::Type::Bits(w) => w,
        ref ty => panic!("expected a scalar type, got {ty}"),
    }
}
