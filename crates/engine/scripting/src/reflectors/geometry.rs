//! Reflectors for vectors, coordinate frames and colors

use super::{bad_operands, operands, opt_f32, pull_f32, push_object, ret_many, wrong_receiver};
use crate::reflector::{Member, Operators, Reflector};
use crate::state::State;
use crate::Error;
use glam::{Vec2, Vec3};
use mlua::prelude::*;
use rtypes::{type_names as t, CFrame, Color3, Value};

pub(super) fn reflectors() -> Vec<Reflector> {
    vec![vector2(), vector3(), cframe(), color3()]
}

fn as_vec2(v: &Value) -> LuaResult<Vec2> {
    match v {
        Value::Vector2(v) => Ok(*v),
        other => Err(wrong_receiver(t::VECTOR2, other)),
    }
}

fn as_vec3(v: &Value) -> LuaResult<Vec3> {
    match v {
        Value::Vector3(v) => Ok(*v),
        other => Err(wrong_receiver(t::VECTOR3, other)),
    }
}

fn as_cframe(v: &Value) -> LuaResult<CFrame> {
    match v {
        Value::CFrame(cf) => Ok(*cf),
        other => Err(wrong_receiver(t::CFRAME, other)),
    }
}

fn as_color3(v: &Value) -> LuaResult<Color3> {
    match v {
        Value::Color3(c) => Ok(*c),
        other => Err(wrong_receiver(t::COLOR3, other)),
    }
}

fn scalar(v: &Value) -> Option<f32> {
    v.as_numberlike().map(|n| n as f32)
}

fn pull_vec3(state: &mut State<'_>, position: usize) -> LuaResult<Vec3> {
    as_vec3(&state.pull(position, t::VECTOR3)?)
}

// Vector2

fn pull_vector2(_: &mut State<'_>, values: &[LuaValue]) -> LuaResult<Value> {
    super::pull_object(values, t::VECTOR2)
}

fn vector2() -> Reflector {
    Reflector {
        push: Some(push_object),
        pull: Some(pull_vector2),
        operators: Operators {
            add: Some(vector2_add),
            sub: Some(vector2_sub),
            mul: Some(vector2_mul),
            div: Some(vector2_div),
            unm: Some(vector2_unm),
            ..Default::default()
        },
        ..Reflector::new(t::VECTOR2)
    }
    .with_constructor("new", vector2_new)
    .with_member("X", Member::property(t::FLOAT, |s, v| s.ret(Value::Float(as_vec2(v)?.x))))
    .with_member("Y", Member::property(t::FLOAT, |s, v| s.ret(Value::Float(as_vec2(v)?.y))))
    .with_member(
        "Magnitude",
        Member::property(t::FLOAT, |s, v| s.ret(Value::Float(as_vec2(v)?.length()))),
    )
    .with_member(
        "Unit",
        Member::property(t::VECTOR2, |s, v| {
            s.ret(Value::Vector2(as_vec2(v)?.normalize_or_zero()))
        }),
    )
    .with_member(
        "Dot",
        Member::method(t::FLOAT, |s, v| {
            let other = as_vec2(&s.pull(1, t::VECTOR2)?)?;
            s.ret(Value::Float(as_vec2(v)?.dot(other)))
        }),
    )
    .with_member(
        "Lerp",
        Member::method(t::VECTOR2, |s, v| {
            let goal = as_vec2(&s.pull(1, t::VECTOR2)?)?;
            let alpha = pull_f32(s, 2)?;
            s.ret(Value::Vector2(as_vec2(v)?.lerp(goal, alpha)))
        }),
    )
}

fn vector2_new(state: &mut State<'_>) -> LuaResult<LuaMultiValue> {
    let x = opt_f32(state, 1, 0.0)?;
    let y = opt_f32(state, 2, 0.0)?;
    state.ret(Value::Vector2(Vec2::new(x, y)))
}

fn vector2_add(state: &mut State<'_>) -> LuaResult<LuaValue> {
    match operands(state)? {
        (Value::Vector2(a), Value::Vector2(b)) => state.push_one(Value::Vector2(a + b)),
        (a, b) => Err(bad_operands("add", &a, &b)),
    }
}

fn vector2_sub(state: &mut State<'_>) -> LuaResult<LuaValue> {
    match operands(state)? {
        (Value::Vector2(a), Value::Vector2(b)) => state.push_one(Value::Vector2(a - b)),
        (a, b) => Err(bad_operands("sub", &a, &b)),
    }
}

fn vector2_mul(state: &mut State<'_>) -> LuaResult<LuaValue> {
    let (a, b) = operands(state)?;
    let product = match (&a, &b) {
        (Value::Vector2(x), Value::Vector2(y)) => Some(*x * *y),
        (Value::Vector2(v), n) | (n, Value::Vector2(v)) => scalar(n).map(|s| *v * s),
        _ => None,
    };
    match product {
        Some(v) => state.push_one(Value::Vector2(v)),
        None => Err(bad_operands("mul", &a, &b)),
    }
}

fn vector2_div(state: &mut State<'_>) -> LuaResult<LuaValue> {
    let (a, b) = operands(state)?;
    let quotient = match (&a, &b) {
        (Value::Vector2(x), Value::Vector2(y)) => Some(*x / *y),
        (Value::Vector2(v), n) => scalar(n).map(|s| *v / s),
        _ => None,
    };
    match quotient {
        Some(v) => state.push_one(Value::Vector2(v)),
        None => Err(bad_operands("div", &a, &b)),
    }
}

fn vector2_unm(state: &mut State<'_>, value: &Value) -> LuaResult<LuaValue> {
    state.push_one(Value::Vector2(-as_vec2(value)?))
}

// Vector3

fn pull_vector3(_: &mut State<'_>, values: &[LuaValue]) -> LuaResult<Value> {
    super::pull_object(values, t::VECTOR3)
}

fn vector3() -> Reflector {
    Reflector {
        push: Some(push_object),
        pull: Some(pull_vector3),
        operators: Operators {
            add: Some(vector3_add),
            sub: Some(vector3_sub),
            mul: Some(vector3_mul),
            div: Some(vector3_div),
            unm: Some(vector3_unm),
            ..Default::default()
        },
        ..Reflector::new(t::VECTOR3)
    }
    .with_constructor("new", vector3_new)
    .with_member("X", Member::property(t::FLOAT, |s, v| s.ret(Value::Float(as_vec3(v)?.x))))
    .with_member("Y", Member::property(t::FLOAT, |s, v| s.ret(Value::Float(as_vec3(v)?.y))))
    .with_member("Z", Member::property(t::FLOAT, |s, v| s.ret(Value::Float(as_vec3(v)?.z))))
    .with_member(
        "Magnitude",
        Member::property(t::FLOAT, |s, v| s.ret(Value::Float(as_vec3(v)?.length()))),
    )
    .with_member(
        "Unit",
        Member::property(t::VECTOR3, |s, v| {
            s.ret(Value::Vector3(as_vec3(v)?.normalize_or_zero()))
        }),
    )
    .with_member(
        "Dot",
        Member::method(t::FLOAT, |s, v| {
            let other = pull_vec3(s, 1)?;
            s.ret(Value::Float(as_vec3(v)?.dot(other)))
        }),
    )
    .with_member(
        "Cross",
        Member::method(t::VECTOR3, |s, v| {
            let other = pull_vec3(s, 1)?;
            s.ret(Value::Vector3(as_vec3(v)?.cross(other)))
        }),
    )
    .with_member(
        "Lerp",
        Member::method(t::VECTOR3, |s, v| {
            let goal = pull_vec3(s, 1)?;
            let alpha = pull_f32(s, 2)?;
            s.ret(Value::Vector3(as_vec3(v)?.lerp(goal, alpha)))
        }),
    )
}

fn vector3_new(state: &mut State<'_>) -> LuaResult<LuaMultiValue> {
    let x = opt_f32(state, 1, 0.0)?;
    let y = opt_f32(state, 2, 0.0)?;
    let z = opt_f32(state, 3, 0.0)?;
    state.ret(Value::Vector3(Vec3::new(x, y, z)))
}

fn vector3_add(state: &mut State<'_>) -> LuaResult<LuaValue> {
    match operands(state)? {
        (Value::Vector3(a), Value::Vector3(b)) => state.push_one(Value::Vector3(a + b)),
        (a, b) => Err(bad_operands("add", &a, &b)),
    }
}

fn vector3_sub(state: &mut State<'_>) -> LuaResult<LuaValue> {
    match operands(state)? {
        (Value::Vector3(a), Value::Vector3(b)) => state.push_one(Value::Vector3(a - b)),
        (a, b) => Err(bad_operands("sub", &a, &b)),
    }
}

fn vector3_mul(state: &mut State<'_>) -> LuaResult<LuaValue> {
    let (a, b) = operands(state)?;
    let product = match (&a, &b) {
        (Value::Vector3(x), Value::Vector3(y)) => Some(*x * *y),
        (Value::Vector3(v), n) | (n, Value::Vector3(v)) => scalar(n).map(|s| *v * s),
        _ => None,
    };
    match product {
        Some(v) => state.push_one(Value::Vector3(v)),
        None => Err(bad_operands("mul", &a, &b)),
    }
}

fn vector3_div(state: &mut State<'_>) -> LuaResult<LuaValue> {
    let (a, b) = operands(state)?;
    let quotient = match (&a, &b) {
        (Value::Vector3(x), Value::Vector3(y)) => Some(*x / *y),
        (Value::Vector3(v), n) => scalar(n).map(|s| *v / s),
        _ => None,
    };
    match quotient {
        Some(v) => state.push_one(Value::Vector3(v)),
        None => Err(bad_operands("div", &a, &b)),
    }
}

fn vector3_unm(state: &mut State<'_>, value: &Value) -> LuaResult<LuaValue> {
    state.push_one(Value::Vector3(-as_vec3(value)?))
}

// CFrame

fn pull_cframe(_: &mut State<'_>, values: &[LuaValue]) -> LuaResult<Value> {
    super::pull_object(values, t::CFRAME)
}

fn cframe() -> Reflector {
    Reflector {
        push: Some(push_object),
        pull: Some(pull_cframe),
        operators: Operators {
            add: Some(cframe_add),
            sub: Some(cframe_sub),
            mul: Some(cframe_mul),
            ..Default::default()
        },
        ..Reflector::new(t::CFRAME)
    }
    .with_constructor("new", cframe_new)
    .with_constructor("Angles", cframe_angles)
    .with_constructor("fromEulerAnglesXYZ", cframe_angles)
    .with_constructor("lookAt", cframe_look_at)
    .with_member(
        "Position",
        Member::property(t::VECTOR3, |s, v| s.ret(Value::Vector3(as_cframe(v)?.position))),
    )
    .with_member("X", Member::property(t::FLOAT, |s, v| s.ret(Value::Float(as_cframe(v)?.position.x))))
    .with_member("Y", Member::property(t::FLOAT, |s, v| s.ret(Value::Float(as_cframe(v)?.position.y))))
    .with_member("Z", Member::property(t::FLOAT, |s, v| s.ret(Value::Float(as_cframe(v)?.position.z))))
    .with_member(
        "LookVector",
        Member::property(t::VECTOR3, |s, v| s.ret(Value::Vector3(as_cframe(v)?.look_vector()))),
    )
    .with_member(
        "RightVector",
        Member::property(t::VECTOR3, |s, v| s.ret(Value::Vector3(as_cframe(v)?.right_vector()))),
    )
    .with_member(
        "UpVector",
        Member::property(t::VECTOR3, |s, v| s.ret(Value::Vector3(as_cframe(v)?.up_vector()))),
    )
    .with_member(
        "Inverse",
        Member::method(t::CFRAME, |s, v| s.ret(Value::CFrame(as_cframe(v)?.inverse()))),
    )
    .with_member(
        "Lerp",
        Member::method(t::CFRAME, |s, v| {
            let goal = as_cframe(&s.pull(1, t::CFRAME)?)?;
            let alpha = pull_f32(s, 2)?;
            s.ret(Value::CFrame(as_cframe(v)?.lerp(&goal, alpha)))
        }),
    )
    .with_member(
        "PointToWorldSpace",
        Member::method(t::VECTOR3, |s, v| {
            let point = pull_vec3(s, 1)?;
            s.ret(Value::Vector3(as_cframe(v)?.point_to_world(point)))
        }),
    )
    .with_member(
        "PointToObjectSpace",
        Member::method(t::VECTOR3, |s, v| {
            let point = pull_vec3(s, 1)?;
            s.ret(Value::Vector3(as_cframe(v)?.point_to_object(point)))
        }),
    )
    .with_member(
        "GetComponents",
        Member::method(t::TUPLE, |s, v| {
            let components = as_cframe(v)?.components();
            ret_many(s, components.iter().map(|c| Value::Float(*c)).collect())
        }),
    )
}

/// `new()`, `new(pos)`, `new(pos, lookAt)`, `new(x, y, z)` or the twelve
/// components
fn cframe_new(state: &mut State<'_>) -> LuaResult<LuaMultiValue> {
    let cf = match state.count() {
        0 => CFrame::IDENTITY,
        1 => CFrame::new(pull_vec3(state, 1)?),
        2 => CFrame::look_at(pull_vec3(state, 1)?, pull_vec3(state, 2)?),
        3 => CFrame::new(Vec3::new(
            pull_f32(state, 1)?,
            pull_f32(state, 2)?,
            pull_f32(state, 3)?,
        )),
        12 => {
            let mut components = [0.0; 12];
            for (i, c) in components.iter_mut().enumerate() {
                *c = pull_f32(state, i + 1)?;
            }
            CFrame::from_components(components)
        }
        n => {
            return Err(Error::runtime(format!(
                "CFrame.new expects 0, 1, 2, 3 or 12 arguments, got {n}"
            ))
            .into())
        }
    };
    state.ret(Value::CFrame(cf))
}

fn cframe_angles(state: &mut State<'_>) -> LuaResult<LuaMultiValue> {
    let rx = opt_f32(state, 1, 0.0)?;
    let ry = opt_f32(state, 2, 0.0)?;
    let rz = opt_f32(state, 3, 0.0)?;
    state.ret(Value::CFrame(CFrame::from_euler_xyz(rx, ry, rz)))
}

fn cframe_look_at(state: &mut State<'_>) -> LuaResult<LuaMultiValue> {
    let eye = pull_vec3(state, 1)?;
    let target = pull_vec3(state, 2)?;
    state.ret(Value::CFrame(CFrame::look_at(eye, target)))
}

fn cframe_mul(state: &mut State<'_>) -> LuaResult<LuaValue> {
    match operands(state)? {
        (Value::CFrame(a), Value::CFrame(b)) => state.push_one(Value::CFrame(a.mul(&b))),
        (Value::CFrame(a), Value::Vector3(p)) => state.push_one(Value::Vector3(a.point_to_world(p))),
        (a, b) => Err(bad_operands("mul", &a, &b)),
    }
}

fn cframe_add(state: &mut State<'_>) -> LuaResult<LuaValue> {
    match operands(state)? {
        (Value::CFrame(a), Value::Vector3(offset)) => state.push_one(Value::CFrame(CFrame {
            position: a.position + offset,
            ..a
        })),
        (a, b) => Err(bad_operands("add", &a, &b)),
    }
}

fn cframe_sub(state: &mut State<'_>) -> LuaResult<LuaValue> {
    match operands(state)? {
        (Value::CFrame(a), Value::Vector3(offset)) => state.push_one(Value::CFrame(CFrame {
            position: a.position - offset,
            ..a
        })),
        (a, b) => Err(bad_operands("sub", &a, &b)),
    }
}

// Color3

fn pull_color3(_: &mut State<'_>, values: &[LuaValue]) -> LuaResult<Value> {
    super::pull_object(values, t::COLOR3)
}

fn color3() -> Reflector {
    Reflector {
        push: Some(push_object),
        pull: Some(pull_color3),
        ..Reflector::new(t::COLOR3)
    }
    .with_constructor("new", color3_new)
    .with_constructor("fromRGB", color3_from_rgb)
    .with_constructor("fromHSV", color3_from_hsv)
    .with_member("R", Member::property(t::FLOAT, |s, v| s.ret(Value::Float(as_color3(v)?.r))))
    .with_member("G", Member::property(t::FLOAT, |s, v| s.ret(Value::Float(as_color3(v)?.g))))
    .with_member("B", Member::property(t::FLOAT, |s, v| s.ret(Value::Float(as_color3(v)?.b))))
    .with_member(
        "Lerp",
        Member::method(t::COLOR3, |s, v| {
            let goal = as_color3(&s.pull(1, t::COLOR3)?)?;
            let alpha = pull_f32(s, 2)?;
            s.ret(Value::Color3(as_color3(v)?.lerp(&goal, alpha)))
        }),
    )
    .with_member(
        "ToHSV",
        Member::method(t::TUPLE, |s, v| {
            let (h, sat, val) = as_color3(v)?.to_hsv();
            ret_many(s, vec![Value::Float(h), Value::Float(sat), Value::Float(val)])
        }),
    )
}

fn color3_components(state: &mut State<'_>) -> LuaResult<(f32, f32, f32)> {
    Ok((
        opt_f32(state, 1, 0.0)?,
        opt_f32(state, 2, 0.0)?,
        opt_f32(state, 3, 0.0)?,
    ))
}

fn color3_new(state: &mut State<'_>) -> LuaResult<LuaMultiValue> {
    let (r, g, b) = color3_components(state)?;
    state.ret(Value::Color3(Color3::new(r, g, b)))
}

fn color3_from_rgb(state: &mut State<'_>) -> LuaResult<LuaMultiValue> {
    let (r, g, b) = color3_components(state)?;
    state.ret(Value::Color3(Color3::from_rgb(r, g, b)))
}

fn color3_from_hsv(state: &mut State<'_>) -> LuaResult<LuaMultiValue> {
    let (h, s, v) = color3_components(state)?;
    state.ret(Value::Color3(Color3::from_hsv(h, s, v)))
}
