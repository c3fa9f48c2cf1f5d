//! Reflectors for UI dimensions and number ranges

use super::{bad_operands, operands, opt_f32, opt_i32, pull_f32, push_object, wrong_receiver};
use crate::reflector::{Member, Operators, Reflector};
use crate::state::State;
use crate::Error;
use mlua::prelude::*;
use rtypes::{type_names as t, NumberRange, UDim, UDim2, Value};

pub(super) fn reflectors() -> Vec<Reflector> {
    vec![udim(), udim2(), number_range()]
}

fn as_udim(v: &Value) -> LuaResult<UDim> {
    match v {
        Value::UDim(u) => Ok(*u),
        other => Err(wrong_receiver(t::UDIM, other)),
    }
}

fn as_udim2(v: &Value) -> LuaResult<UDim2> {
    match v {
        Value::UDim2(u) => Ok(*u),
        other => Err(wrong_receiver(t::UDIM2, other)),
    }
}

fn as_range(v: &Value) -> LuaResult<NumberRange> {
    match v {
        Value::NumberRange(r) => Ok(*r),
        other => Err(wrong_receiver(t::NUMBER_RANGE, other)),
    }
}

fn pull_udim(_: &mut State<'_>, values: &[LuaValue]) -> LuaResult<Value> {
    super::pull_object(values, t::UDIM)
}

fn udim() -> Reflector {
    Reflector {
        push: Some(push_object),
        pull: Some(pull_udim),
        operators: Operators {
            add: Some(udim_add),
            sub: Some(udim_sub),
            unm: Some(udim_unm),
            ..Default::default()
        },
        ..Reflector::new(t::UDIM)
    }
    .with_constructor("new", udim_new)
    .with_member("Scale", Member::property(t::FLOAT, |s, v| s.ret(Value::Float(as_udim(v)?.scale))))
    .with_member("Offset", Member::property(t::INT, |s, v| s.ret(Value::Int(as_udim(v)?.offset))))
    .with_member(
        "Lerp",
        Member::method(t::UDIM, |s, v| {
            let goal = as_udim(&s.pull(1, t::UDIM)?)?;
            let alpha = pull_f32(s, 2)?;
            s.ret(Value::UDim(as_udim(v)?.lerp(&goal, alpha)))
        }),
    )
}

fn udim_new(state: &mut State<'_>) -> LuaResult<LuaMultiValue> {
    let scale = opt_f32(state, 1, 0.0)?;
    let offset = opt_i32(state, 2, 0)?;
    state.ret(Value::UDim(UDim::new(scale, offset)))
}

fn udim_add(state: &mut State<'_>) -> LuaResult<LuaValue> {
    match operands(state)? {
        (Value::UDim(a), Value::UDim(b)) => state.push_one(Value::UDim(a.add(&b))),
        (a, b) => Err(bad_operands("add", &a, &b)),
    }
}

fn udim_sub(state: &mut State<'_>) -> LuaResult<LuaValue> {
    match operands(state)? {
        (Value::UDim(a), Value::UDim(b)) => state.push_one(Value::UDim(a.sub(&b))),
        (a, b) => Err(bad_operands("sub", &a, &b)),
    }
}

fn udim_unm(state: &mut State<'_>, value: &Value) -> LuaResult<LuaValue> {
    state.push_one(Value::UDim(as_udim(value)?.neg()))
}

fn pull_udim2(_: &mut State<'_>, values: &[LuaValue]) -> LuaResult<Value> {
    super::pull_object(values, t::UDIM2)
}

fn udim2() -> Reflector {
    Reflector {
        push: Some(push_object),
        pull: Some(pull_udim2),
        operators: Operators {
            add: Some(udim2_add),
            sub: Some(udim2_sub),
            unm: Some(udim2_unm),
            ..Default::default()
        },
        ..Reflector::new(t::UDIM2)
    }
    .with_constructor("new", udim2_new)
    .with_constructor("fromScale", udim2_from_scale)
    .with_constructor("fromOffset", udim2_from_offset)
    .with_member("X", Member::property(t::UDIM, |s, v| s.ret(Value::UDim(as_udim2(v)?.x))))
    .with_member("Y", Member::property(t::UDIM, |s, v| s.ret(Value::UDim(as_udim2(v)?.y))))
    .with_member("Width", Member::property(t::UDIM, |s, v| s.ret(Value::UDim(as_udim2(v)?.x))))
    .with_member("Height", Member::property(t::UDIM, |s, v| s.ret(Value::UDim(as_udim2(v)?.y))))
    .with_member(
        "Lerp",
        Member::method(t::UDIM2, |s, v| {
            let goal = as_udim2(&s.pull(1, t::UDIM2)?)?;
            let alpha = pull_f32(s, 2)?;
            s.ret(Value::UDim2(as_udim2(v)?.lerp(&goal, alpha)))
        }),
    )
}

/// `new(xScale, xOffset, yScale, yOffset)` or `new(x, y)` with two UDims
fn udim2_new(state: &mut State<'_>) -> LuaResult<LuaMultiValue> {
    let value = if state.count() == 2 {
        let x = as_udim(&state.pull(1, t::UDIM)?)?;
        let y = as_udim(&state.pull(2, t::UDIM)?)?;
        UDim2::new(x, y)
    } else {
        UDim2::new(
            UDim::new(opt_f32(state, 1, 0.0)?, opt_i32(state, 2, 0)?),
            UDim::new(opt_f32(state, 3, 0.0)?, opt_i32(state, 4, 0)?),
        )
    };
    state.ret(Value::UDim2(value))
}

fn udim2_from_scale(state: &mut State<'_>) -> LuaResult<LuaMultiValue> {
    let x = opt_f32(state, 1, 0.0)?;
    let y = opt_f32(state, 2, 0.0)?;
    state.ret(Value::UDim2(UDim2::from_scale(x, y)))
}

fn udim2_from_offset(state: &mut State<'_>) -> LuaResult<LuaMultiValue> {
    let x = opt_i32(state, 1, 0)?;
    let y = opt_i32(state, 2, 0)?;
    state.ret(Value::UDim2(UDim2::from_offset(x, y)))
}

fn udim2_add(state: &mut State<'_>) -> LuaResult<LuaValue> {
    match operands(state)? {
        (Value::UDim2(a), Value::UDim2(b)) => state.push_one(Value::UDim2(a.add(&b))),
        (a, b) => Err(bad_operands("add", &a, &b)),
    }
}

fn udim2_sub(state: &mut State<'_>) -> LuaResult<LuaValue> {
    match operands(state)? {
        (Value::UDim2(a), Value::UDim2(b)) => state.push_one(Value::UDim2(a.sub(&b))),
        (a, b) => Err(bad_operands("sub", &a, &b)),
    }
}

fn udim2_unm(state: &mut State<'_>, value: &Value) -> LuaResult<LuaValue> {
    state.push_one(Value::UDim2(as_udim2(value)?.neg()))
}

fn pull_number_range(_: &mut State<'_>, values: &[LuaValue]) -> LuaResult<Value> {
    super::pull_object(values, t::NUMBER_RANGE)
}

fn number_range() -> Reflector {
    Reflector {
        push: Some(push_object),
        pull: Some(pull_number_range),
        ..Reflector::new(t::NUMBER_RANGE)
    }
    .with_constructor("new", number_range_new)
    .with_member("Min", Member::property(t::FLOAT, |s, v| s.ret(Value::Float(as_range(v)?.min))))
    .with_member("Max", Member::property(t::FLOAT, |s, v| s.ret(Value::Float(as_range(v)?.max))))
}

/// `new(value)` or `new(min, max)`
fn number_range_new(state: &mut State<'_>) -> LuaResult<LuaMultiValue> {
    let min = pull_f32(state, 1)?;
    let max = opt_f32(state, 2, min)?;
    let range = NumberRange::new(min, max).map_err(Error::from)?;
    state.ret(Value::NumberRange(range))
}

#[cfg(test)]
mod tests {
    use crate::testing::{eval, eval_err};
    use rtypes::{UDim, UDim2, Value};

    #[test]
    fn test_udim2_forms() {
        let expected = Value::UDim2(UDim2::new(UDim::new(0.5, 10), UDim::new(0.0, 4)));
        assert_eq!(eval("return UDim2.new(0.5, 10, 0, 4)"), expected);
        assert_eq!(eval("return UDim2.new(UDim.new(0.5, 10), UDim.new(0, 4))"), expected);
        assert_eq!(
            eval("return UDim2.fromOffset(1, 2) + UDim2.fromOffset(3, 4)"),
            Value::UDim2(UDim2::from_offset(4, 6))
        );
        assert_eq!(eval("return UDim.new(0, 7.9).Offset"), Value::Int64(7));
    }

    #[test]
    fn test_number_range_validates() {
        assert_eq!(eval("return NumberRange.new(2).Max"), Value::Double(2.0));
        let err = eval_err("return NumberRange.new(3, 1)");
        assert!(err.contains("larger than maximum"), "{err}");
    }
}
