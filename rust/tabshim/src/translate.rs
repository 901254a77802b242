//! Narrowing of scripting requests to the legacy tabs shape.
//!
//! The legacy API accepts one tab, at most one frame, at most one file, and
//! code only as text. Translation is a strict narrowing: anything the
//! request asks for that the legacy shape cannot carry is an error, never a
//! silent drop.
//!
//! | Scripting request                | Legacy options                  |
//! |----------------------------------|---------------------------------|
//! | `target.tabId`                   | returned alongside the options  |
//! | `target.frameIds: [n]`           | `frameId: n`                    |
//! | `target.allFrames`               | `allFrames`                     |
//! | `files: [f]`                     | `file: f`                       |
//! | `injectImmediately: true`        | `runAt: "document_start"`       |
//! | `func` + `args`                  | `code: "(<func>)(...<args>)"`   |
//! | `css` (CSS insertion only)       | `code`                          |
//! | `world`                          | rejected                        |
//! | `file`, `frameId`, `runAt`, `allFrames`, `code` | rejected         |
//!
//! Translation is synchronous and performs no I/O.

use serde_json::{Map, Value};
use tabshim_effects::scripting::{InjectionRequest, InjectionTarget};
use tabshim_effects::tabs::{LegacyOptions, RunAt, TabId};

use crate::TranslateError;

/// Fields that only exist in the legacy options record.
pub const LEGACY_ONLY_FIELDS: [&str; 5] = ["file", "frameId", "runAt", "allFrames", "code"];

/// Translate a script injection request into legacy `(tabId, options)`.
pub fn translate(request: InjectionRequest) -> Result<(TabId, LegacyOptions), TranslateError> {
    narrow(request, Payload::Script)
}

/// Translate a CSS insertion request into legacy `(tabId, options)`.
///
/// Inline `css` becomes the legacy `code` field. A request may name `css`
/// or `files` but not both, and may not carry a function.
pub fn translate_css(request: InjectionRequest) -> Result<(TabId, LegacyOptions), TranslateError> {
    narrow(request, Payload::Stylesheet)
}

/// Translate a loosely-typed options record, as received across a
/// JavaScript boundary, into legacy `(tabId, options)`.
///
/// Checks that the record is an object, then refuses legacy-only fields and
/// `world` before reading the rest of it.
pub fn translate_record(record: Value) -> Result<(TabId, LegacyOptions), TranslateError> {
    translate(parse_record(record)?)
}

/// Read a loosely-typed options record into an [`InjectionRequest`],
/// applying the same up-front refusals as [`translate_record`].
pub fn parse_record(record: Value) -> Result<InjectionRequest, TranslateError> {
    let Value::Object(fields) = record else {
        return Err(TranslateError::MalformedRequest(format!(
            "expected an options object, found {}",
            kind_of(&record)
        )));
    };

    reject_legacy_fields(&fields)?;

    if is_set(&fields, "world") {
        return Err(TranslateError::WorldUnsupported);
    }

    serde_json::from_value(Value::Object(fields))
        .map_err(|error| TranslateError::MalformedRequest(error.to_string()))
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Payload {
    Script,
    Stylesheet,
}

fn narrow(
    request: InjectionRequest,
    payload: Payload,
) -> Result<(TabId, LegacyOptions), TranslateError> {
    let InjectionRequest {
        target,
        files,
        func,
        args,
        css,
        inject_immediately,
        world,
        mut extra,
    } = request;

    reject_legacy_fields(&extra)?;

    if world.is_some() {
        return Err(TranslateError::WorldUnsupported);
    }

    let InjectionTarget {
        tab_id,
        frame_ids,
        all_frames,
    } = target;

    let mut options = LegacyOptions {
        frame_id: sole(frame_ids, |count| TranslateError::MultipleFrames { count })?,
        file: sole(files, |count| TranslateError::MultipleFiles { count })?,
        all_frames,
        ..Default::default()
    };

    if inject_immediately == Some(true) {
        options.run_at = Some(RunAt::DocumentStart);
    }

    let arguments = args
        .map(|args| format!("...{}", Value::Array(args)))
        .unwrap_or_default();

    match payload {
        Payload::Script => {
            if let Some(func) = func {
                options.code = Some(format!("({})({arguments})", func.source()));
            }
            if let Some(css) = css {
                extra.insert("css".into(), Value::String(css));
            }
        }
        Payload::Stylesheet => {
            if func.is_some() {
                return Err(TranslateError::FunctionInStylesheet);
            }
            if css.is_some() && options.file.is_some() {
                return Err(TranslateError::MixedContent);
            }
            options.code = css;
        }
    }

    options.extra = extra;

    Ok((tab_id, options))
}

/// Collapse an optional list to its only element, refusing longer lists.
fn sole<T>(
    items: Option<Vec<T>>,
    too_many: impl FnOnce(usize) -> TranslateError,
) -> Result<Option<T>, TranslateError> {
    let Some(mut items) = items else {
        return Ok(None);
    };
    match items.len() {
        0 | 1 => Ok(items.pop()),
        count => Err(too_many(count)),
    }
}

fn reject_legacy_fields(fields: &Map<String, Value>) -> Result<(), TranslateError> {
    match LEGACY_ONLY_FIELDS
        .iter()
        .find(|field| is_set(fields, field))
    {
        Some(field) => Err(TranslateError::LegacyField((*field).to_owned())),
        None => Ok(()),
    }
}

fn is_set(fields: &Map<String, Value>, name: &str) -> bool {
    fields.get(name).is_some_and(|value| !value.is_null())
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
