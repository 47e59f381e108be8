//! Natives par défaut, enregistrées comme globales.

use std::time::{SystemTime, UNIX_EPOCH};

use gnbs_core::{
    heap::Heap,
    object::{NativeError, NativeFn},
    value::Value,
};

/// `(nom, arité, fonction)` des natives préchargées.
pub const DEFAULTS: &[(&str, Option<u8>, NativeFn)] = &[
    ("clock", Some(0), native_clock as NativeFn),
    ("str",   Some(1), native_str as NativeFn),
];

/// Secondes depuis l'epoch Unix, en flottant.
pub fn native_clock(_args: &[Value], _heap: &mut Heap) -> Result<Value, NativeError> {
    let t = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| NativeError::Msg(format!("clock error: {e}")))?;
    Ok(Value::Float(t.as_secs_f64()))
}

/// Forme affichable d'une valeur, comme chaîne internée.
pub fn native_str(args: &[Value], heap: &mut Heap) -> Result<Value, NativeError> {
    let Some(&value) = args.first() else {
        return Err(NativeError::Msg("str: missing argument".into()));
    };
    if value.as_str_ref().is_some() {
        return Ok(value);
    }
    let text = heap.display(value).to_string();
    Ok(Value::Str(heap.intern_owned(text)))
}
