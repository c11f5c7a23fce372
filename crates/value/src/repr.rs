//! Canonical string representation: the textual form a diagnostic or log
//! line shows for a folded literal.

use crate::traits::Governor;
use crate::value::{Value, ValueKind, Verdict};
use std::fmt;
use vfold_strings::Quadruple;

pub fn get_string_repr<G: Governor>(v: &Value<G>) -> String {
    format_kind(&v.kind)
}

fn format_real(r: f64) -> String {
    if r.is_nan() {
        return "not_a_number".to_string();
    }
    if r.is_infinite() {
        return if r > 0.0 { "infinity".to_string() } else { "-infinity".to_string() };
    }
    let mag = r.abs();
    if mag != 0.0 && (mag < 1e-4 || mag >= 1e10) {
        format!("{r:e}")
    } else {
        let s = format!("{r}");
        if s.contains('.') { s } else { format!("{s}.0") }
    }
}

fn escape_char_byte(b: u8, out: &mut String) {
    match b {
        0x07 => out.push_str("\\a"),
        0x08 => out.push_str("\\b"),
        0x09 => out.push_str("\\t"),
        0x0A => out.push_str("\\n"),
        0x0B => out.push_str("\\v"),
        0x0C => out.push_str("\\f"),
        0x0D => out.push_str("\\r"),
        b'\\' => out.push_str("\\\\"),
        b'"' => out.push_str("\\\""),
        0x20..=0x7E => out.push(b as char),
        other => out.push_str(&format!("\" & char(0, 0, 0, {other}) & \"")),
    }
}

fn format_cstr_bytes(bytes: &[u8]) -> String {
    let mut body = String::new();
    for &b in bytes {
        escape_char_byte(b, &mut body);
    }
    format!("\"{body}\"")
}

fn format_quadruple(q: &Quadruple) -> String {
    if q.is_ascii() {
        let mut body = String::new();
        escape_char_byte(q.cell, &mut body);
        format!("\"{body}\"")
    } else {
        format!("char({}, {}, {}, {})", q.group, q.plane, q.row, q.cell)
    }
}

fn format_verdict(v: Verdict) -> &'static str {
    match v {
        Verdict::None => "none",
        Verdict::Pass => "pass",
        Verdict::Inconc => "inconc",
        Verdict::Fail => "fail",
        Verdict::Error => "error",
    }
}

fn format_kind<G: Governor>(k: &ValueKind<G>) -> String {
    match k {
        ValueKind::Null | ValueKind::TtcnNull | ValueKind::DefaultNull | ValueKind::FatNull => "null".to_string(),
        ValueKind::Bool(b) => b.to_string(),
        ValueKind::Int(i) => i.to_string(),
        ValueKind::Real(r) => format_real(*r),
        ValueKind::Enum(name, _) => name.clone(),
        ValueKind::Verdict(v) => format_verdict(*v).to_string(),
        ValueKind::Omit => "omit".to_string(),
        ValueKind::NotUsed => "-".to_string(),
        ValueKind::Bstr(s) => format!("'{}'B", String::from_utf8_lossy(s.as_bytes())),
        ValueKind::Hstr(s) => format!("'{}'H", String::from_utf8_lossy(s.as_bytes())),
        ValueKind::Ostr(s) => format!("'{}'O", String::from_utf8_lossy(s.as_bytes())),
        ValueKind::Cstr(s) => format_cstr_bytes(s.as_bytes()),
        ValueKind::Iso2022str(s) => format_cstr_bytes(s.as_bytes()),
        ValueKind::Ustr(s) => {
            if s.quads().iter().all(Quadruple::is_ascii) {
                format_cstr_bytes(&s.quads().iter().map(|q| q.cell).collect::<Vec<_>>())
            } else {
                s.quads().iter().map(format_quadruple).collect::<Vec<_>>().join(" & ")
            }
        }
        ValueKind::Oid(components) | ValueKind::Roid(components) => {
            let body: Vec<String> = components
                .iter()
                .map(|c| match &c.name {
                    Some(n) => format!("{n}({})", c.number),
                    None => c.number.to_string(),
                })
                .collect();
            format!("{{ {} }}", body.join(" "))
        }
        ValueKind::NamedBits(names) => {
            let body: Vec<&str> = names.iter().map(String::as_str).collect();
            format!("({})", body.join(", "))
        }
        ValueKind::Choice { alt_name, alt_value } => {
            format!("{{ {alt_name} := {} }}", format_kind(&alt_value.borrow().kind))
        }
        ValueKind::SeqOf(xs) | ValueKind::Array(xs) | ValueKind::SetOf(xs) => {
            let body: Vec<String> = xs.iter().map(|x| format_kind(&x.borrow().kind)).collect();
            format!("{{ {} }}", body.join(", "))
        }
        ValueKind::Seq(fields) | ValueKind::Set(fields) => {
            let body: Vec<String> = fields
                .iter()
                .map(|(name, v)| format!("{name} := {}", format_kind(&v.borrow().kind)))
                .collect();
            format!("{{ {} }}", body.join(", "))
        }
        ValueKind::AnyValue(_) => "?".to_string(),
        ValueKind::AnyOrOmit(_) => "*".to_string(),
        ValueKind::Error => "<error>".to_string(),
        _ => "<unfolded>".to_string(),
    }
}

impl<G: Governor> fmt::Display for Value<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", format_kind(&self.kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::testutil::DummyGovernor;
    use vfold_strings::CharString;

    #[test]
    fn int_and_bool_print_plainly() {
        let v = Value::<DummyGovernor>::new_int(-5);
        assert_eq!(get_string_repr(&v), "-5");
        let b = Value::<DummyGovernor>::new_bool(true);
        assert_eq!(get_string_repr(&b), "true");
    }

    #[test]
    fn real_switches_to_exponential_outside_the_fixed_point_range() {
        assert_eq!(format_real(1.5e12), format!("{:e}", 1.5e12));
        assert_eq!(format_real(1.5), "1.5");
    }

    #[test]
    fn charstring_escapes_control_bytes() {
        let v = Value::<DummyGovernor>::synthetic(ValueKind::Cstr(CharString::new(b"a\nb".to_vec()).unwrap()));
        assert_eq!(get_string_repr(&v), "\"a\\nb\"");
    }

    #[test]
    fn seq_renders_as_field_assignment_list() {
        let v = Value::<DummyGovernor>::synthetic(ValueKind::Seq(vec![
            ("x".to_string(), Value::new_int(1).into_ref()),
            ("y".to_string(), Value::new_bool(false).into_ref()),
        ]));
        assert_eq!(get_string_repr(&v), "{ x := 1, y := false }");
    }
}
