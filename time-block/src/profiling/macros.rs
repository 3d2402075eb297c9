//! Macros for labelling scopes after the code they measure

/// Name of the enclosing function, e.g. `load` or `Loader::run`.
///
/// Module segments are dropped and async bodies resolve to the `async fn`
/// they belong to.
#[macro_export]
macro_rules! qualified_name {
    () => {{
        fn f() {}
        fn type_name_of<T>(_: T) -> &'static str {
            ::std::any::type_name::<T>()
        }
        $crate::profiling::macros::trim_qualified_name(type_name_of(f))
    }};
}

/// Build a [`Call`](crate::Call) for the enclosing function.
///
/// `fn_call!(a, b; retries = n)` renders as `name(a, b, retries=n)` when the
/// scope prints its arguments. Values are rendered with `Debug`.
#[macro_export]
macro_rules! fn_call {
    ($($arg:expr),* ; $($key:ident = $val:expr),+ $(,)?) => {
        $crate::Call::new($crate::qualified_name!())
            $(.arg(&$arg))*
            $(.kwarg(stringify!($key), &$val))+
    };
    ($($arg:expr),* $(,)?) => {
        $crate::Call::new($crate::qualified_name!())
            $(.arg(&$arg))*
    };
}

/// Turn the `type_name` of a marker fn nested in some function into that
/// function's name.
#[doc(hidden)]
pub fn trim_qualified_name(raw: &str) -> String {
    let raw = raw.strip_suffix("::f").unwrap_or(raw);
    let segments: Vec<&str> = raw
        .split("::")
        .filter(|segment| *segment != "{{closure}}")
        .collect();

    match segments.as_slice() {
        [] => String::new(),
        [.., owner, name] if owner.starts_with(|c: char| c.is_ascii_uppercase()) => {
            format!("{owner}::{name}")
        }
        [.., name] => (*name).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trim_qualified_name() {
        assert_eq!(trim_qualified_name("app::io::load::f"), "load");
        assert_eq!(trim_qualified_name("app::io::Loader::run::f"), "Loader::run");
        assert_eq!(trim_qualified_name("app::fetch::{{closure}}::f"), "fetch");
        assert_eq!(trim_qualified_name("main::f"), "main");
    }

    #[test]
    fn test_qualified_name_of_function() {
        fn measured() -> String {
            crate::qualified_name!()
        }
        assert_eq!(measured(), "measured");
    }

    #[tokio::test]
    async fn test_qualified_name_of_async_function() {
        async fn fetch() -> String {
            tokio::task::yield_now().await;
            crate::qualified_name!()
        }
        assert_eq!(fetch().await, "fetch");
    }

    #[test]
    fn test_fn_call_forms() {
        fn run(n: u32) -> crate::Call {
            crate::fn_call!(n, "x"; retries = 3, dry = false)
        }
        assert_eq!(run(1).label(true), "run(1, \"x\", dry=false, retries=3)");

        fn bare() -> crate::Call {
            crate::fn_call!()
        }
        assert_eq!(bare().label(true), "bare()");
        assert_eq!(bare().name(), "bare");
    }
}
