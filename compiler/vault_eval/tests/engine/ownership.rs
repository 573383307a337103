//! Resources move, structures copy, owners follow containers.

use pretty_assertions::assert_eq;
use vault_eval::{
    Address, CompositeValue, DictionaryValue, EvalErrorKind, FunctionValue, Interpreter,
    InternalError, Trampoline, Value,
};
use vault_ir::{BinaryOp, CompositeKind, ExprId, FunctionType, Name, StaticType, StmtKind};

use crate::common::Program;

fn vault(balance: i64) -> Value {
    Value::Composite(CompositeValue::new(
        Name::from_raw(900),
        CompositeKind::Resource,
        [(Name::from_raw(901), Value::Int(balance))],
    ))
}

#[test]
fn moved_source_is_unusable() {
    // let r <- Vault { balance: 1 }; let a <- [<- r]; return r
    let mut program = Program::new();
    let one = program.arena.int(1);
    let fresh = program.resource("Vault", &[("balance", one)]);
    let fresh = program.arena.move_of(fresh);
    let bind_r = program.let_("r", fresh);
    let r = program.ident("r");
    let moved = program.arena.move_of(r);
    let array = program.arena.array([moved]);
    let array = program.arena.move_of(array);
    let bind_a = program.let_("a", array);
    let r = program.ident("r");
    let ret = program.ret(r);
    let (_, result) = program.execute(vec![bind_r, bind_a, ret]);
    assert_eq!(
        result.map_err(|err| err.kind).err(),
        Some(EvalErrorKind::ResourceMoved {
            name: "r".to_string()
        })
    );
}

#[test]
fn move_keeps_identity_and_empties_the_source() {
    // let q <- vault; return q
    let mut program = Program::new();
    let name = program.name("vault");
    let original = vault(10);
    program.interpreter.define_global(name, original.clone());
    let source = program.arena.ident(name);
    let moved = program.arena.move_of(source);
    let bind = program.let_("q", moved);
    let q = program.ident("q");
    let ret = program.ret(q);
    let read_again = program.arena.ident(name);
    let block = program.arena.block([bind, ret]);
    let (mut interpreter, arena) = program.finish(&[]);

    let (Value::Composite(result), Value::Composite(original)) =
        (interpreter.execute(&arena, block).unwrap(), original)
    else {
        panic!("a moved resource stays a composite");
    };
    assert!(result.ptr_eq(&original));

    let err = interpreter.evaluate(&arena, read_again).unwrap_err();
    assert_eq!(
        err.kind,
        EvalErrorKind::ResourceMoved {
            name: "vault".to_string()
        }
    );
}

#[test]
fn structures_copy_into_fields() {
    // let s = S { n: 1 }; let t = T { inner: s }; t.inner.n = 5; return s.n
    let mut program = Program::new();
    let one = program.arena.int(1);
    let s = program.structure("S", &[("n", one)]);
    let bind_s = program.let_("s", s);
    let s = program.ident("s");
    let t = program.structure("T", &[("inner", s)]);
    let bind_t = program.let_("t", t);
    let t = program.ident("t");
    let inner = program.field(t, "inner");
    let target = program.field(inner, "n");
    let five = program.arena.int(5);
    let write = program
        .arena
        .push_stmt(StmtKind::Assign { target, value: five });
    let s = program.ident("s");
    let read = program.field(s, "n");
    let ret = program.ret(read);
    let (_, result) = program.execute(vec![bind_s, bind_t, write, ret]);
    assert_eq!(result.ok(), Some(Value::Int(1)));
}

#[test]
fn copies_are_independent_and_unowned() {
    let field = Name::from_raw(1);
    let original = Value::Composite(CompositeValue::new(
        Name::from_raw(2),
        CompositeKind::Structure,
        [(field, Value::array(vec![Value::Int(1)]))],
    ));
    original.set_owner(Some(Address::from_u64(7)));

    let copy = original.copy().unwrap();
    assert_eq!(copy, original);
    assert_eq!(copy.owner(), None);
    assert_eq!(original.owner(), Some(Address::from_u64(7)));

    let Value::Composite(copied) = &copy else {
        panic!("copy keeps the variant");
    };
    let Some(Value::Array(items)) = copied.get_field(field) else {
        panic!("copy keeps fields");
    };
    items.push(Value::Int(2));
    assert_ne!(copy, original);
}

#[test]
fn copying_through_a_container_finds_nested_resources() {
    let array = Value::array(vec![Value::Int(1), vault(3)]);
    let err = array.copy().unwrap_err();
    assert!(err.is_fatal());
    assert!(matches!(
        err.kind,
        EvalErrorKind::Internal(InternalError::ImplicitResourceCopy { .. })
    ));
}

#[test]
fn owner_is_visible_through_every_alias() {
    let inner = vault(5);
    let dict =
        DictionaryValue::from_entries([(Value::string("main"), Value::some(inner.clone()))])
            .unwrap();
    let alias = Value::Dictionary(dict.clone());
    let account = Address::from_u64(0xabc);

    alias.set_owner(Some(account));
    assert_eq!(dict.owner(), Some(account));
    assert_eq!(inner.owner(), Some(account));

    Value::Dictionary(dict).set_owner(None);
    assert_eq!(alias.owner(), None);
    assert_eq!(inner.owner(), None);
}

#[test]
fn dictionaries_keep_insertion_order() {
    // let d = {3: 1, 1: 2, 2: 3}; d[0] = Some(4); d[1] = Some(9); return d
    let mut program = Program::new();
    let entries: Vec<_> = [(3, 1), (1, 2), (2, 3)]
        .into_iter()
        .map(|(k, v)| (program.arena.int(k), program.arena.int(v)))
        .collect();
    let dict = program.arena.dictionary(entries);
    let bind = program.let_("d", dict);
    let mut writes = Vec::new();
    for (key, value) in [(0, 4), (1, 9)] {
        let (d, key) = (program.ident("d"), program.arena.int(key));
        let target = program.arena.index(d, key);
        let value = program.arena.int(value);
        let value = program.arena.some(value);
        writes.push(program.arena.push_stmt(StmtKind::Assign { target, value }));
    }
    let d = program.ident("d");
    let ret = program.ret(d);
    let mut stmts = vec![bind];
    stmts.extend(writes);
    stmts.push(ret);
    let (_, result) = program.execute(stmts);

    let Ok(Value::Dictionary(dict)) = result else {
        panic!("block returns the dictionary");
    };
    let keys: Vec<Value> = dict.keys();
    assert_eq!(
        keys,
        vec![Value::Int(3), Value::Int(1), Value::Int(2), Value::Int(0)]
    );
    assert_eq!(dict.get(&Value::Int(1)).unwrap(), Some(Value::Int(9)));
}

#[test]
fn destroyed_variable_is_moved() {
    // let r <- Vault { balance: 1 }; destroy <- r; return r.balance
    let mut program = Program::new();
    let one = program.arena.int(1);
    let fresh = program.resource("Vault", &[("balance", one)]);
    let fresh = program.arena.move_of(fresh);
    let bind = program.let_("r", fresh);
    let r = program.ident("r");
    let moved = program.arena.move_of(r);
    let destroy = program.arena.push_stmt(StmtKind::Destroy(moved));
    let r = program.ident("r");
    let balance = program.field(r, "balance");
    let ret = program.ret(balance);
    let (_, result) = program.execute(vec![bind, destroy, ret]);
    assert_eq!(
        result.map_err(|err| err.kind).err(),
        Some(EvalErrorKind::ResourceMoved {
            name: "r".to_string()
        })
    );
}

#[test]
fn destroying_a_variable_consumes_it() {
    // let r <- Vault { balance: 1 }; destroy r; return r
    let mut program = Program::new();
    let one = program.arena.int(1);
    let fresh = program.resource("Vault", &[("balance", one)]);
    let fresh = program.arena.move_of(fresh);
    let bind = program.let_("r", fresh);
    let r = program.ident("r");
    let destroy = program.arena.push_stmt(StmtKind::Destroy(r));
    let r = program.ident("r");
    let ret = program.ret(r);
    let (_, result) = program.execute(vec![bind, destroy, ret]);
    assert_eq!(
        result.map_err(|err| err.kind).err(),
        Some(EvalErrorKind::ResourceMoved {
            name: "r".to_string()
        })
    );
}

#[test]
fn repeated_move_in_one_list_takes_nothing() {
    // let a <- [<- vault, <- vault]
    let mut program = Program::new();
    let name = program.name("vault");
    program.interpreter.define_global(name, vault(1));
    let moves: Vec<ExprId> = (0..2)
        .map(|_| {
            let source = program.arena.ident(name);
            program.arena.move_of(source)
        })
        .collect();
    let array = program.arena.array(moves);
    let array = program.arena.move_of(array);
    let bind = program.let_("a", array);
    let (interpreter, result) = program.execute(vec![bind]);
    assert_eq!(
        result.map_err(|err| err.kind).err(),
        Some(EvalErrorKind::ResourceMoved {
            name: "vault".to_string()
        })
    );
    assert!(interpreter
        .globals()
        .lookup(name)
        .is_some_and(|variable| !variable.is_moved()));
}

/// Run `let a <- <list>` under every step budget from 1 up, where `list`
/// moves the global `r` and then does more work. A run cut short must
/// leave `r` bound and owned; a finished run must have consumed it.
fn moves_land_with_their_list(list: impl Fn(&mut Program, ExprId, ExprId) -> ExprId) {
    let account = Address::from_u64(0x7);
    let mut finished = false;
    for budget in 1..=60 {
        let mut program = Program::with(Interpreter::builder().step_budget(budget).build());
        let r = program.name("r");
        let resource = vault(1);
        resource.set_owner(Some(account));
        program.interpreter.define_global(r, resource.clone());

        let source = program.arena.ident(r);
        let moved = program.arena.move_of(source);
        let (one, two) = (program.arena.int(1), program.arena.int(2));
        let sum = program.arena.binary(BinaryOp::Add, one, two);
        let value = list(&mut program, moved, sum);
        let value = program.arena.move_of(value);
        let bind = program.let_("a", value);
        let (interpreter, result) = program.execute(vec![bind]);

        let taken = interpreter
            .globals()
            .lookup(r)
            .is_some_and(|variable| variable.is_moved());
        match result {
            Ok(_) => {
                assert!(taken, "budget {budget}: finished without moving r");
                finished = true;
                break;
            }
            Err(err) => {
                assert_eq!(err.kind, EvalErrorKind::StepBudgetExceeded { budget });
                assert!(!taken, "budget {budget}: aborted after taking r");
                assert_eq!(resource.owner(), Some(account));
            }
        }
    }
    assert!(finished);
}

#[test]
fn aborted_array_literal_keeps_its_moves() {
    // let a <- [<- r, 1 + 2]
    moves_land_with_their_list(|program, moved, sum| program.arena.array([moved, sum]));
}

#[test]
fn aborted_nested_literal_keeps_its_moves() {
    // let a <- [Some(<- r), 1 + 2]
    moves_land_with_their_list(|program, moved, sum| {
        let some = program.arena.some(moved);
        program.arena.array([some, sum])
    });
    // let a <- Holder { inner: <- r, extra: 1 + 2 }
    moves_land_with_their_list(|program, moved, sum| {
        program.resource("Holder", &[("inner", moved), ("extra", sum)])
    });
}

#[test]
fn aborted_call_keeps_its_argument_moves() {
    // let a <- first(<- r, 1 + 2)
    moves_land_with_their_list(|program, moved, sum| {
        let name = program.name("first");
        let ty = FunctionType::new(vec![StaticType::Any; 2], StaticType::Any);
        let first = FunctionValue::host(name, ty, |invocation| {
            invocation.expect_arity(2)?;
            Ok(Trampoline::done(invocation.argument(0)?.clone()))
        });
        program
            .interpreter
            .define_global(name, Value::Function(first));
        program.call("first", vec![moved, sum])
    });
}
