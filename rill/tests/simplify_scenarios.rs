// End-to-end scenarios for the dataflow simplification pass.
//
// Each scenario builds a small graph through the library API, runs the pass,
// and checks both the structural outcome (which uses got rewired, which
// nodes were detached) and behavior (the interpreter agrees before and
// after). Listings are locked with inline insta snapshots where the exact
// shape matters.

use rill::interp::eval;
use rill::ir::Function;
use rill::pass::{Pass, PassOptions};
use rill::simplify::DataflowSimplification;
use rill::ty::Type;
use rill::value::Value;

fn run(f: &mut Function) -> bool {
    DataflowSimplification
        .run(f, &PassOptions::default())
        .unwrap()
}

// ── Scenario 1: tuple_index(tuple(x, y), 1) => y ────────────────────────────

#[test]
fn tuple_index_of_tuple_forwards_the_field() {
    let mut f = Function::new("scenario1");
    let x = f.param("x", Type::bits(8));
    let y = f.param("y", Type::bits(8));
    let t = f.tuple(vec![x, y]);
    let r = f.tuple_index(t, 1);
    let n = f.not(r);
    f.set_return(n);

    let args = [Value::bits(8, 3), Value::bits(8, 5)];
    let before = eval(&f, &args);

    assert!(run(&mut f));
    assert_eq!(f.node(n).operands, vec![y]);
    assert!(!f.is_live(r), "r should have no remaining uses and be detached");
    assert_eq!(eval(&f, &args), before);

    insta::assert_snapshot!(format!("{f}"), @r#"
    fn scenario1(x: bits[8], y: bits[8]) {
      tuple.2: (bits[8], bits[8]) = tuple(x, y)
      not.4: bits[8] = not(y)
      ret not.4
    }
    "#);
}

// ── Scenario 2: sel(c, {z, z}) => z ─────────────────────────────────────────

#[test]
fn select_with_identical_cases_forwards_the_case() {
    let mut f = Function::new("scenario2");
    let c = f.param("c", Type::bits(1));
    let z = f.param("z", Type::bits(8));
    let s = f.select(c, vec![z, z]);
    let n = f.not(s);
    f.set_return(n);

    let args = [Value::bits(1, 1), Value::bits(8, 7)];
    let before = eval(&f, &args);

    assert!(run(&mut f));
    assert_eq!(f.node(n).operands, vec![z]);
    assert!(!f.is_live(s));
    assert_eq!(eval(&f, &args), before);

    insta::assert_snapshot!(format!("{f}"), @r#"
    fn scenario2(c: bits[1], z: bits[8]) {
      not.3: bits[8] = not(z)
      ret not.3
    }
    "#);
}

// ── Scenario 3: array_index(array_update(A, x, 42), 42) => x ────────────────

#[test]
fn index_of_update_at_same_literal_forwards_the_value() {
    let mut f = Function::new("scenario3");
    let a = f.param("a", Type::array(Type::bits(8), 48));
    let x = f.param("x", Type::bits(8));
    let i = f.literal(Value::bits(8, 42));
    let u = f.array_update(a, x, i);
    let j = f.literal(Value::bits(8, 42));
    let r = f.array_index(u, j);
    let n = f.not(r);
    f.set_return(n);

    let arr = Value::array((0..48).map(|k| Value::bits(8, k)).collect());
    let args = [arr, Value::bits(8, 99)];
    let before = eval(&f, &args);

    assert!(run(&mut f));
    assert_eq!(f.node(n).operands, vec![x]);
    assert!(!f.is_live(r));
    // The update itself mixes origins (a and x) and is left alone.
    assert!(f.is_live(u));
    assert_eq!(eval(&f, &args), before);
}

// ── Scenario 4 (negative): dynamic update blocks the static lookup ──────────

#[test]
fn dynamic_update_prevents_the_rewrite() {
    let mut f = Function::new("scenario4");
    let a = f.param("a", Type::array(Type::bits(8), 48));
    let x = f.param("x", Type::bits(8));
    let i = f.param("i", Type::bits(8));
    let u = f.array_update(a, x, i);
    let j = f.literal(Value::bits(8, 42));
    let r = f.array_index(u, j);
    f.set_return(r);

    // The dynamic update could have hit slot 42; nothing may change.
    assert!(!run(&mut f));
    assert!(f.is_live(r));
    assert_eq!(f.return_node(), Some(r));
    assert_eq!(f.node(r).operands, vec![u, j]);
}

// ── Scenario 5 (negative): disagreeing select cases ─────────────────────────

#[test]
fn select_with_distinct_cases_is_left_alone() {
    let mut f = Function::new("scenario5");
    let c = f.param("c", Type::bits(1));
    let x = f.param("x", Type::bits(8));
    let y = f.param("y", Type::bits(8));
    let s = f.select(c, vec![x, y]);
    f.set_return(s);

    assert!(!run(&mut f));
    assert_eq!(f.return_node(), Some(s));
}

// ── Structured rewrites and idempotence ─────────────────────────────────────

#[test]
fn aggregate_valued_select_forwards_whole_structure() {
    // Agreement at every leaf lets an aggregate select collapse even though
    // its output is a tuple.
    let mut f = Function::new("aggregate");
    let c = f.param("c", Type::bits(1));
    let p = f.param("p", Type::tuple(vec![Type::bits(8), Type::bits(4)]));
    let s = f.select(c, vec![p, p]);
    let r = f.tuple_index(s, 0);
    f.set_return(r);

    assert!(run(&mut f));
    assert!(!f.is_live(s));
    let ret = f.return_node().unwrap();
    assert_eq!(f.node(ret).operands, vec![p]);
}

#[test]
fn second_run_reaches_a_fixed_point() {
    let mut f = Function::new("fixed_point");
    let c = f.param("c", Type::bits(1));
    let x = f.param("x", Type::bits(8));
    let y = f.param("y", Type::bits(8));
    let t = f.tuple(vec![x, y]);
    let r0 = f.tuple_index(t, 0);
    let s = f.select(c, vec![r0, r0]);
    let a = f.identity(s);
    let u = f.add(a, y);
    f.set_return(u);

    let args = [Value::bits(1, 0), Value::bits(8, 11), Value::bits(8, 22)];
    let before = eval(&f, &args);

    assert!(run(&mut f));
    assert_eq!(eval(&f, &args), before);
    assert!(!run(&mut f), "pass must be idempotent");
    assert_eq!(eval(&f, &args), before);
}

#[test]
fn disabled_at_opt_level_zero() {
    let mut f = Function::new("gated");
    let x = f.param("x", Type::bits(8));
    let a = f.identity(x);
    f.set_return(a);

    let options = PassOptions {
        opt_level: 0,
        dataflow: None,
    };
    assert!(!DataflowSimplification.run(&mut f, &options).unwrap());
    assert!(f.is_live(a));
}
