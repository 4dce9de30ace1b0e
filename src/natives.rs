// ABOUTME: Native callables registered as globals: clock, random, stdin, file I/O

use crate::env::Environment;
use crate::error::SagaError;
use crate::value::{Callable, NativeFn, Value};
use rand::Rng;
use std::io::Write;
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Installs every native callable into the global environment (spec.md §4.7).
pub fn register(globals: &Rc<Environment>) {
    define(globals, "clock", 0, clock);
    define(globals, "random", 0, random);
    define(globals, "random_int", 2, random_int);
    define(globals, "input", -1, input);
    define(globals, "read_file", 1, read_file);
    define(globals, "write_file", 2, write_file);
    define(globals, "append_file", 2, append_file);
    define(globals, "file_exists", 1, file_exists);
    define(globals, "delete_file", 1, delete_file);
}

fn define(globals: &Rc<Environment>, name: &'static str, arity: i32, func: fn(&[Value]) -> Result<Value, SagaError>) {
    globals.define(name, Value::Callable(Callable::Native(Rc::new(NativeFn { name, arity, func }))));
}

fn native_error(message: impl Into<String>) -> SagaError {
    SagaError::new(0, 0, message)
}

fn expect_string<'a>(value: &'a Value, arg_pos: &str) -> Result<&'a str, SagaError> {
    match value {
        Value::String(s) => Ok(s),
        _ => Err(native_error(format!("expected a string for {}", arg_pos))),
    }
}

fn expect_int(value: &Value, arg_pos: &str) -> Result<i64, SagaError> {
    match value {
        Value::Int(n) => Ok(*n),
        _ => Err(native_error(format!("expected an int for {}", arg_pos))),
    }
}

fn clock(_args: &[Value]) -> Result<Value, SagaError> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| native_error(e.to_string()))?;
    Ok(Value::Float(now.as_secs_f64()))
}

fn random(_args: &[Value]) -> Result<Value, SagaError> {
    Ok(Value::Float(rand::random::<f64>()))
}

fn random_int(args: &[Value]) -> Result<Value, SagaError> {
    let lo = expect_int(&args[0], "the lower bound")?;
    let hi = expect_int(&args[1], "the upper bound")?;
    if lo > hi {
        return Err(native_error("random_int: lower bound must not exceed upper bound"));
    }
    Ok(Value::Int(rand::thread_rng().gen_range(lo..=hi)))
}

/// Variadic: `input()` or `input(prompt)` (spec.md §4.7).
fn input(args: &[Value]) -> Result<Value, SagaError> {
    if args.len() > 1 {
        return Err(native_error(format!("input: expected 0 or 1 arguments but got {}.", args.len())));
    }
    if let Some(prompt) = args.first() {
        let prompt = expect_string(prompt, "the prompt")?;
        print!("{}", prompt);
        std::io::stdout().flush().map_err(|e| native_error(e.to_string()))?;
    }
    let mut line = String::new();
    std::io::stdin()
        .read_line(&mut line)
        .map_err(|e| native_error(e.to_string()))?;
    if line.ends_with('\n') {
        line.pop();
        if line.ends_with('\r') {
            line.pop();
        }
    }
    Ok(Value::String(line))
}

fn read_file(args: &[Value]) -> Result<Value, SagaError> {
    let path = expect_string(&args[0], "the path")?;
    std::fs::read_to_string(path)
        .map(Value::String)
        .map_err(|e| native_error(format!("read_file: {}", e)))
}

fn write_file(args: &[Value]) -> Result<Value, SagaError> {
    let path = expect_string(&args[0], "the path")?;
    let content = expect_string(&args[1], "the content")?;
    std::fs::write(path, content)
        .map(|_| Value::Nil)
        .map_err(|e| native_error(format!("write_file: {}", e)))
}

fn append_file(args: &[Value]) -> Result<Value, SagaError> {
    let path = expect_string(&args[0], "the path")?;
    let content = expect_string(&args[1], "the content")?;
    let result = (|| -> std::io::Result<()> {
        let mut file = std::fs::OpenOptions::new().create(true).append(true).open(path)?;
        file.write_all(content.as_bytes())
    })();
    result.map(|_| Value::Nil).map_err(|e| native_error(format!("append_file: {}", e)))
}

fn file_exists(args: &[Value]) -> Result<Value, SagaError> {
    let path = expect_string(&args[0], "the path")?;
    Ok(Value::Bool(std::path::Path::new(path).exists()))
}

fn delete_file(args: &[Value]) -> Result<Value, SagaError> {
    let path = expect_string(&args[0], "the path")?;
    std::fs::remove_file(path)
        .map(|_| Value::Nil)
        .map_err(|e| native_error(format!("delete_file: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_int_is_inclusive_and_bounded() {
        let result = random_int(&[Value::Int(3), Value::Int(3)]).unwrap();
        assert_eq!(result, Value::Int(3));
    }

    #[test]
    fn random_int_rejects_inverted_bounds() {
        assert!(random_int(&[Value::Int(5), Value::Int(1)]).is_err());
    }

    #[test]
    fn file_roundtrip_through_write_read_delete() {
        let path = Value::String(std::env::temp_dir().join("saga_native_test.txt").to_string_lossy().to_string());
        let content = Value::String("hello saga".to_string());
        write_file(&[path.clone(), content.clone()]).unwrap();
        assert_eq!(read_file(&[path.clone()]).unwrap(), content);
        assert_eq!(file_exists(&[path.clone()]).unwrap(), Value::Bool(true));
        delete_file(&[path.clone()]).unwrap();
        assert_eq!(file_exists(&[path]).unwrap(), Value::Bool(false));
    }

    #[test]
    fn read_missing_file_is_an_error() {
        let path = Value::String("/nonexistent/path/does-not-exist.txt".to_string());
        assert!(read_file(&[path]).is_err());
    }
}
