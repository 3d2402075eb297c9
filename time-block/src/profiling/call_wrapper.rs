//! Measuring whole function calls
//!
//! A [`Call`] describes one invocation (function name plus rendered
//! arguments); [`Decor`] runs the body under a scope labelled with it.
//! Use [`fn_call!`](crate::fn_call) to build a `Call` named after the
//! enclosing function.

use std::{collections::BTreeMap, fmt::Debug, future::Future};

use super::{scope::ScopeGuard, time_block::TimeBlock};
use crate::config::ScopeOptions;

/// One function invocation, as shown in scope labels.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Call {
    name: String,
    args: Vec<String>,
    kwargs: BTreeMap<String, String>,
}

impl Call {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Append a positional argument, rendered with `Debug`.
    #[must_use]
    pub fn arg<T: Debug + ?Sized>(mut self, value: &T) -> Self {
        self.args.push(format!("{value:?}"));
        self
    }

    /// Add a keyword argument, rendered as `key=value`.
    #[must_use]
    pub fn kwarg<K: Into<String>, T: Debug + ?Sized>(mut self, key: K, value: &T) -> Self {
        self.kwargs.insert(key.into(), format!("{value:?}"));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `(a, b, k=v)`: positional arguments first, then keywords by key.
    pub fn rendered_args(&self) -> String {
        let rendered: Vec<String> = self
            .args
            .iter()
            .cloned()
            .chain(self.kwargs.iter().map(|(k, v)| format!("{k}={v}")))
            .collect();
        format!("({})", rendered.join(", "))
    }

    /// Scope label: the bare name, or name plus arguments.
    pub fn label(&self, print_args: bool) -> String {
        if print_args {
            format!("{}{}", self.name, self.rendered_args())
        } else {
            self.name.clone()
        }
    }
}

/// Runs calls under scopes with fixed options.
#[derive(Clone, Copy)]
pub struct Decor<'a> {
    tb: &'a TimeBlock,
    options: ScopeOptions,
}

impl<'a> Decor<'a> {
    pub(crate) fn new(tb: &'a TimeBlock, options: ScopeOptions) -> Self {
        Self { tb, options }
    }

    pub fn options(&self) -> ScopeOptions {
        self.options
    }

    fn open(&self, call: &Call) -> ScopeGuard<'a> {
        self.tb
            .enter_with(call.label(self.options.print_args), self.options)
    }

    pub fn call<R, F: FnOnce() -> R>(&self, call: Call, f: F) -> R {
        let _guard = self.open(&call);
        f()
    }

    pub fn try_call<T, E, F>(&self, call: Call, f: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        let mut guard = self.open(&call);
        let out = f();
        if out.is_err() {
            guard.mark_failed();
        }
        out
    }

    /// Measure an async call from its first poll to completion, in a
    /// context of its own.
    pub async fn acall<F: Future>(&self, call: Call, fut: F) -> F::Output {
        self.tb
            .actx_with(call.label(self.options.print_args), self.options, fut)
            .await
    }

    pub async fn try_acall<F, T, E>(&self, call: Call, fut: F) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
    {
        self.tb
            .try_actx_with(call.label(self.options.print_args), self.options, fut)
            .await
    }

    /// Wrap `f` once; every call of the result is measured as `name`.
    pub fn wrap<S, R, F>(self, name: S, f: F) -> impl Fn() -> R
    where
        S: Into<String>,
        F: Fn() -> R + 'a,
    {
        let name = name.into();
        move || self.call(Call::new(name.as_str()), &f)
    }

    /// Like [`wrap`](Self::wrap) for one-argument functions. The argument
    /// is part of the label when `print_args` is on.
    pub fn wrap_arg<S, A, R, F>(self, name: S, f: F) -> impl Fn(A) -> R
    where
        S: Into<String>,
        A: Debug,
        F: Fn(A) -> R + 'a,
    {
        let name = name.into();
        move |arg| {
            let call = Call::new(name.as_str()).arg(&arg);
            self.call(call, || f(arg))
        }
    }
}
