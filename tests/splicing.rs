//! End-to-end tests for locating and editing instructions with a cursor.
//!
//! These mirror the way patches use the engine: find an anchor with a matcher sequence, look at
//! the stack around it, then splice new instructions in.

use cilsplice::prelude::*;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn debug_log() -> MethodRef {
    MethodRef::new(
        TypeSig::class("UnityEngine.Debug"),
        "Log",
        MethodSig::new_static(vec![TypeSig::Object], TypeSig::Void),
    )
}

fn camera_context() -> MethodContext {
    MethodContext::new(
        TypeSig::class("CameraController"),
        "LateUpdate",
        MethodSig::new_instance(vec![TypeSig::F32], TypeSig::Void),
    )
    .with_locals(vec![TypeSig::value_type("UnityEngine.Vector3"), TypeSig::F32])
}

#[test]
fn insert_before_return() -> Result<()> {
    init_logging();

    let mut cursor = Cursor::new(vec![Instruction::load_argument(0), Instruction::ret()]);
    let ret = [Matcher::opcode(Opcode::Ret)];

    cursor.seek_forward(&ret)?;
    assert_eq!(cursor.position()?, 1);
    cursor.insert_in_place(vec![Instruction::call(debug_log())])?;

    // The anchor still resolves, at its shifted index
    assert_eq!(
        find_sequence(cursor.instructions()?, &ret, 0).map(|m| m.start),
        Some(2)
    );

    assert_eq!(
        cursor.release()?,
        vec![
            Instruction::load_argument(0),
            Instruction::call(debug_log()),
            Instruction::ret()
        ]
    );
    Ok(())
}

#[test]
fn type_inference_through_a_local() -> Result<()> {
    let ctx = camera_context();
    let list = vec![
        Instruction::load_int(5),
        Instruction::store_local(0),
        Instruction::load_local(0),
    ];

    assert_eq!(infer_pushed_type(&ctx, &list, 2)?, Some(TypeSig::I32));
    // Without a store the declared local type is used
    assert_eq!(
        infer_pushed_type(&ctx, &[Instruction::load_local(1)], 0)?,
        Some(TypeSig::F32)
    );
    Ok(())
}

#[test]
fn stack_position_seek_lands_on_each_argument() -> Result<()> {
    let three_args = MethodRef::new(
        TypeSig::class("UnityEngine.Mathf"),
        "Clamp",
        MethodSig::new_static(vec![TypeSig::F32, TypeSig::F32, TypeSig::F32], TypeSig::F32),
    );
    let list = vec![
        Instruction::load_argument(1),
        Instruction::load_float(0.0),
        Instruction::load_float(1.0),
        Instruction::call(three_args.clone()),
        Instruction::ret(),
    ];

    for (position, producer) in [(0, 2), (1, 1), (2, 0)] {
        let mut cursor = Cursor::new(list.clone());
        cursor
            .seek_forward(&[Matcher::method(three_args.clone())])?
            .seek_by_stack_position(position)?;
        assert_eq!(cursor.position()?, producer);
    }
    Ok(())
}

#[test]
fn stack_position_seek_skips_nested_expressions() -> Result<()> {
    let ctx = camera_context();
    let set_fov = MethodRef::new(
        TypeSig::class("UnityEngine.Camera"),
        "set_fieldOfView",
        MethodSig::new_instance(vec![TypeSig::F32], TypeSig::Void),
    );
    let camera = FieldRef::new(
        TypeSig::class("CameraController"),
        "camera",
        TypeSig::class("UnityEngine.Camera"),
    );

    // camera.fieldOfView = arg1 * 2f
    let mut cursor = Cursor::new(vec![
        Instruction::load_argument(0),
        Instruction::load_field(camera, false),
        Instruction::load_argument(1),
        Instruction::load_float(2.0),
        Instruction::new(Opcode::Mul),
        Instruction::call_virtual(set_fov.clone()),
        Instruction::ret(),
    ]);

    cursor.seek_forward(&[Matcher::call_to("UnityEngine.Camera", "set_fieldOfView")])?;
    assert_eq!(cursor.infer_stack_type(&ctx, 0)?, Some(TypeSig::F32));
    assert_eq!(
        cursor.infer_stack_type(&ctx, 1)?,
        Some(TypeSig::class("UnityEngine.Camera"))
    );

    cursor.seek_by_stack_position(1)?;
    assert_eq!(cursor.position()?, 1);
    Ok(())
}

#[test]
fn replace_keeps_branches_valid() -> Result<()> {
    init_logging();

    let skip = Label(0);
    let mut cursor = Cursor::new(vec![
        Instruction::load_argument(1),
        Instruction::branch(Opcode::BrfalseS, skip),
        Instruction::load_int(10).with_label(Label(7)),
        Instruction::store_local(1),
        Instruction::ret().with_label(skip),
    ]);

    let saved = cursor.seek_forward(&[Matcher::int_constant(10)])?.position()?;
    cursor.replace(vec![Instruction::load_int(20), Instruction::new(Opcode::Nop)])?;

    // Jump target of the replaced instruction moved to the replacement
    assert_eq!(cursor.current()?, Some(&Instruction::load_int(20).with_label(Label(7))));

    cursor
        .seek_forward(&[Matcher::opcode(Opcode::Ret)])?
        .remove(1)?
        .seek_to(saved)?;
    assert_eq!(cursor.position()?, 2);

    let list = cursor.release()?;
    assert_eq!(list.len(), 5);
    // The removed `ret` handed its label to the new tail
    assert_eq!(list[4], Instruction::store_local(1).with_label(skip));
    Ok(())
}

#[test]
fn missed_anchor_leaves_list_untouched() -> Result<()> {
    let original = vec![Instruction::load_argument(0), Instruction::ret()];
    let mut cursor = Cursor::new(original.clone());

    cursor
        .seek_forward(&[Matcher::opcode(Opcode::Throw)])?
        .insert_in_place(vec![Instruction::new(Opcode::Nop)])?
        .replace(vec![Instruction::new(Opcode::Nop)])?
        .remove(5)?;

    assert!(!cursor.is_valid());
    assert_eq!(cursor.release()?, original);
    Ok(())
}

#[test]
fn captures_are_available_after_seek() -> Result<()> {
    let speed = FieldRef::new(TypeSig::class("Player"), "speed", TypeSig::F32);
    let mut cursor = Cursor::new(vec![
        Instruction::load_argument(0),
        Instruction::load_field(speed.clone(), false),
        Instruction::load_float(1.5),
        Instruction::new(Opcode::Mul),
        Instruction::store_local(0),
        Instruction::ret(),
    ]);

    cursor.seek_forward(&[
        Matcher::field_named("speed").capture_operand("field"),
        Matcher::any_int_constant().or(Matcher::opcode(Opcode::LdcR4)).capture("factor"),
        Matcher::opcode(Opcode::Mul),
    ])?;

    let found = cursor.last_match().cloned();
    assert_eq!(cursor.position()?, 1);
    let found = found.ok_or_else(|| Error::Error("no match recorded".into()))?;
    assert_eq!(found.capture("field"), Some(&Capture::Field(speed)));
    assert_eq!(
        found.capture("factor"),
        Some(&Capture::Instruction(Instruction::load_float(1.5)))
    );
    Ok(())
}

#[test]
fn release_is_single_shot() -> Result<()> {
    let mut cursor = Cursor::new(vec![Instruction::ret()]);
    assert_eq!(cursor.release()?, vec![Instruction::ret()]);

    assert!(matches!(cursor.release(), Err(Error::InvalidCursorState)));
    assert!(matches!(cursor.seek_relative(1), Err(Error::InvalidCursorState)));
    assert!(matches!(cursor.seek_to(0), Err(Error::InvalidCursorState)));
    assert!(matches!(
        cursor.insert_before_cursor(vec![]),
        Err(Error::InvalidCursorState)
    ));
    assert!(matches!(cursor.remove(1), Err(Error::InvalidCursorState)));
    assert!(matches!(cursor.position(), Err(Error::InvalidCursorState)));
    Ok(())
}
