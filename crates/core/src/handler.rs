//! Handler bindings: validated, invocable wrappers around job functions.
//!
//! A [`HandlerBinding`] owns a [`JobFn`] and the [`Signature`] it declared at
//! construction. Two kinds of callables can be bound:
//!
//! - **Typed closures** (`Fn(A, B, ..) -> R`, up to eight parameters), where
//!   every parameter implements [`FromArg`] and the return type implements
//!   [`IntoOutcome`]. Their signature is derived from the types, so they are
//!   always well-shaped.
//! - **Dynamic callables** that implement [`JobFn`] by hand, e.g. handlers whose
//!   signature is only known from configuration. They declare their own
//!   signature and return slots, which is what [`HandlerBinding::validate`]
//!   checks.
//!
//! ## Validation vs execution
//!
//! [`HandlerBinding::validate`] is the strict pass: return shape, arity and
//! per-argument kinds. [`HandlerBinding::execute`] only re-checks arity before
//! calling; arguments it receives were validated when they were enqueued.

use std::any::Any;
use std::marker::PhantomData;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use tracing::warn;

use crate::args::ArgumentList;
use crate::error::{BoxError, BusinessError, InvocationError, JobError, ShapeError};
use crate::value::{ArgKind, ArgValue, FromArg};

/// Declared shape of one return slot.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ReturnKind {
    /// Error-like outcome: absent on success, present on failure.
    Outcome,
    /// A plain value of the given kind.
    Value(ArgKind),
}

/// What a callable produced in one return slot.
#[derive(Debug)]
pub enum Returned {
    Outcome(Result<(), BoxError>),
    Value(ArgValue),
}

/// Parameter and return shape of a callable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    params: Vec<ArgKind>,
    returns: Vec<ReturnKind>,
}

impl Signature {
    pub fn new(params: Vec<ArgKind>, returns: Vec<ReturnKind>) -> Self {
        Self { params, returns }
    }

    /// Signature of a well-formed job: the given parameters, one outcome.
    pub fn job(params: Vec<ArgKind>) -> Self {
        Self::new(params, vec![ReturnKind::Outcome])
    }

    pub fn params(&self) -> &[ArgKind] {
        &self.params
    }

    pub fn returns(&self) -> &[ReturnKind] {
        &self.returns
    }
}

/// A callable that can be bound to a job.
///
/// Implementations must be safe to call concurrently; a binding is shared by
/// every execution of its job type.
pub trait JobFn: Send + Sync + 'static {
    /// The callable's declared shape. Read once, when the binding is built.
    fn signature(&self) -> Signature;

    /// Call with positional arguments and report every return slot.
    fn call(&self, args: &[ArgValue]) -> Result<Vec<Returned>, InvocationError>;
}

/// Return types that satisfy the error-like contract.
///
/// `Result<(), E>` and `Option<E>` (absent error = success) qualify for any
/// `E` convertible into a boxed error.
pub trait IntoOutcome {
    fn into_outcome(self) -> Result<(), BoxError>;
}

impl<E: Into<BoxError>> IntoOutcome for Result<(), E> {
    fn into_outcome(self) -> Result<(), BoxError> {
        self.map_err(Into::into)
    }
}

impl<E: Into<BoxError>> IntoOutcome for Option<E> {
    fn into_outcome(self) -> Result<(), BoxError> {
        match self {
            Some(err) => Err(err.into()),
            None => Ok(()),
        }
    }
}

/// Conversion of a typed function into a [`JobFn`].
///
/// `Marker` is the function-pointer shape of `Self`; it only exists to keep
/// the per-arity implementations apart.
pub trait IntoJobFn<Marker> {
    type Fn: JobFn;

    fn into_job_fn(self) -> Self::Fn;
}

/// [`JobFn`] adapter over a typed closure.
pub struct TypedFn<F, Marker> {
    f: F,
    _marker: PhantomData<Marker>,
}

fn take<T: FromArg>(args: &[ArgValue], index: usize) -> Result<T, InvocationError> {
    let value = args.get(index).ok_or(InvocationError::ArityMismatch {
        expected: index + 1,
        found: args.len(),
    })?;
    T::from_arg(value).ok_or(InvocationError::ArgumentMismatch {
        index,
        expected: T::KIND,
        found: value.kind(),
    })
}

macro_rules! impl_typed_fn {
    ($($param:ident => $index:tt),*) => {
        impl<F, R, $($param,)*> JobFn for TypedFn<F, fn($($param,)*) -> R>
        where
            F: Fn($($param),*) -> R + Send + Sync + 'static,
            R: IntoOutcome + 'static,
            $($param: FromArg + 'static,)*
        {
            fn signature(&self) -> Signature {
                Signature::job(vec![$(<$param as FromArg>::KIND),*])
            }

            #[allow(non_snake_case, unused_variables)]
            fn call(&self, args: &[ArgValue]) -> Result<Vec<Returned>, InvocationError> {
                $(let $param = take::<$param>(args, $index)?;)*
                Ok(vec![Returned::Outcome((self.f)($($param),*).into_outcome())])
            }
        }

        impl<F, R, $($param,)*> IntoJobFn<fn($($param,)*) -> R> for F
        where
            F: Fn($($param),*) -> R + Send + Sync + 'static,
            R: IntoOutcome + 'static,
            $($param: FromArg + 'static,)*
        {
            type Fn = TypedFn<F, fn($($param,)*) -> R>;

            fn into_job_fn(self) -> Self::Fn {
                TypedFn {
                    f: self,
                    _marker: PhantomData,
                }
            }
        }
    };
}

impl_typed_fn!();
impl_typed_fn!(A => 0);
impl_typed_fn!(A => 0, B => 1);
impl_typed_fn!(A => 0, B => 1, C => 2);
impl_typed_fn!(A => 0, B => 1, C => 2, D => 3);
impl_typed_fn!(A => 0, B => 1, C => 2, D => 3, E => 4);
impl_typed_fn!(A => 0, B => 1, C => 2, D => 3, E => 4, G => 5);
impl_typed_fn!(A => 0, B => 1, C => 2, D => 3, E => 4, G => 5, H => 6);
impl_typed_fn!(A => 0, B => 1, C => 2, D => 3, E => 4, G => 5, H => 6, I => 7);

/// A job function bound together with its (immutable) signature.
///
/// Cloning is cheap; clones share the callable.
#[derive(Clone)]
pub struct HandlerBinding {
    func: Arc<dyn JobFn>,
    signature: Arc<Signature>,
}

impl HandlerBinding {
    /// Bind a typed function.
    pub fn new<F, M>(f: F) -> Self
    where
        F: IntoJobFn<M>,
    {
        Self::from_dyn(f.into_job_fn())
    }

    /// Bind a callable that declares its own signature.
    pub fn from_dyn(func: impl JobFn) -> Self {
        let signature = func.signature();
        Self {
            func: Arc::new(func),
            signature: Arc::new(signature),
        }
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn parameter_count(&self) -> usize {
        self.signature.params.len()
    }

    pub fn parameter_kinds(&self) -> &[ArgKind] {
        &self.signature.params
    }

    /// Check the return shape: exactly one slot, and it must be an outcome.
    pub fn validate_signature(&self) -> Result<(), ShapeError> {
        match self.signature.returns.as_slice() {
            [ReturnKind::Outcome] => Ok(()),
            [ReturnKind::Value(kind)] => Err(ShapeError::ReturnNotOutcome { found: *kind }),
            other => Err(ShapeError::ReturnArity { found: other.len() }),
        }
    }

    /// Full shape check of the handler against a concrete argument list.
    pub fn validate(&self, args: &ArgumentList) -> Result<(), ShapeError> {
        self.validate_signature()?;

        let params = &self.signature.params;
        if params.len() != args.len() {
            return Err(ShapeError::ArityMismatch {
                expected: params.len(),
                found: args.len(),
            });
        }

        for (index, (expected, value)) in params.iter().zip(args.iter()).enumerate() {
            let found = value.kind();
            if *expected != found {
                return Err(ShapeError::KindMismatch {
                    index,
                    expected: *expected,
                    found,
                });
            }
        }
        Ok(())
    }

    /// Invoke the bound callable.
    ///
    /// Returns `Ok(())` on success, [`JobError::Business`] with the callable's
    /// own error on failure, and [`JobError::Invocation`] when the call itself
    /// could not be made or did not produce a single outcome. A panic inside
    /// the callable is caught and reported as [`InvocationError::Panicked`].
    pub fn execute(&self, args: &ArgumentList) -> Result<(), JobError> {
        let expected = self.parameter_count();
        if expected != args.len() {
            return Err(InvocationError::ArityMismatch {
                expected,
                found: args.len(),
            }
            .into());
        }

        let func = &self.func;
        let returned = catch_unwind(AssertUnwindSafe(|| func.call(args.as_slice())))
            .map_err(|payload| {
                let message = panic_message(payload.as_ref());
                warn!(error = %message, "job handler panicked");
                InvocationError::Panicked(message)
            })??;

        let [only] = <[Returned; 1]>::try_from(returned).map_err(|all| {
            InvocationError::ReturnArity { found: all.len() }
        })?;

        match only {
            Returned::Outcome(Ok(())) => Ok(()),
            Returned::Outcome(Err(err)) => Err(BusinessError::new(err).into()),
            Returned::Value(value) => Err(InvocationError::ReturnNotOutcome {
                found: value.kind(),
            }
            .into()),
        }
    }
}

impl core::fmt::Debug for HandlerBinding {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HandlerBinding")
            .field("signature", &self.signature)
            .finish_non_exhaustive()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use proptest::prelude::*;

    use super::*;
    use crate::args;

    #[derive(Debug, thiserror::Error, PartialEq)]
    #[error("mailbox {0} rejected the message")]
    struct Rejected(String);

    fn send_email(to: String, retries: i64) -> Result<(), Rejected> {
        if to.ends_with("@blocked.example") {
            return Err(Rejected(to));
        }
        let _ = retries;
        Ok(())
    }

    fn noop(_a: i64, _b: String) -> Result<(), BoxError> {
        Ok(())
    }

    /// Dynamic callable with a hand-declared, possibly malformed, signature.
    struct Scripted {
        signature: Signature,
        returns: fn() -> Vec<Returned>,
    }

    impl JobFn for Scripted {
        fn signature(&self) -> Signature {
            self.signature.clone()
        }

        fn call(&self, _args: &[ArgValue]) -> Result<Vec<Returned>, InvocationError> {
            Ok((self.returns)())
        }
    }

    #[test]
    fn typed_function_declares_its_signature() {
        let binding = HandlerBinding::new(send_email);
        assert_eq!(binding.parameter_count(), 2);
        assert_eq!(binding.parameter_kinds(), &[ArgKind::Str, ArgKind::Int]);
        assert_eq!(binding.signature().returns(), &[ReturnKind::Outcome]);
        assert!(binding.validate_signature().is_ok());
    }

    #[test]
    fn validate_accepts_matching_arguments() {
        let binding = HandlerBinding::new(send_email);
        assert!(binding.validate(&args!["a@example.com", 0]).is_ok());
    }

    #[test]
    fn validate_rejects_wrong_arity_and_kinds() {
        let binding = HandlerBinding::new(send_email);

        assert_eq!(
            binding.validate(&args!["a@example.com"]),
            Err(ShapeError::ArityMismatch {
                expected: 2,
                found: 1
            })
        );
        assert_eq!(
            binding.validate(&args![0, "a@example.com"]),
            Err(ShapeError::KindMismatch {
                index: 0,
                expected: ArgKind::Str,
                found: ArgKind::Int
            })
        );
    }

    #[test]
    fn validate_matches_integer_kinds_not_widths() {
        let binding = HandlerBinding::new(|level: i8| -> Result<(), BoxError> {
            let _ = level;
            Ok(())
        });
        assert!(binding.validate(&args![5i64]).is_ok());
        assert!(binding.validate(&args![5u8]).is_err());
    }

    #[test]
    fn validate_rejects_non_outcome_returns() {
        let two_returns = HandlerBinding::from_dyn(Scripted {
            signature: Signature::new(vec![], vec![ReturnKind::Outcome, ReturnKind::Outcome]),
            returns: Vec::new,
        });
        assert_eq!(
            two_returns.validate(&ArgumentList::new()),
            Err(ShapeError::ReturnArity { found: 2 })
        );

        let no_return = HandlerBinding::from_dyn(Scripted {
            signature: Signature::new(vec![], vec![]),
            returns: Vec::new,
        });
        assert_eq!(
            no_return.validate_signature(),
            Err(ShapeError::ReturnArity { found: 0 })
        );

        let value_return = HandlerBinding::from_dyn(Scripted {
            signature: Signature::new(vec![], vec![ReturnKind::Value(ArgKind::Int)]),
            returns: Vec::new,
        });
        assert_eq!(
            value_return.validate_signature(),
            Err(ShapeError::ReturnNotOutcome {
                found: ArgKind::Int
            })
        );
    }

    #[test]
    fn execute_runs_with_matching_arguments() {
        let binding = HandlerBinding::new(noop);
        assert!(binding.execute(&args![3, "x"]).is_ok());
    }

    #[test]
    fn execute_rechecks_arity_only() {
        let binding = HandlerBinding::new(noop);
        let err = binding.execute(&args![3]).unwrap_err();
        assert!(matches!(
            err,
            JobError::Invocation(InvocationError::ArityMismatch {
                expected: 2,
                found: 1
            })
        ));
    }

    #[test]
    fn execute_propagates_the_callable_error() {
        let binding = HandlerBinding::new(send_email);
        let err = binding.execute(&args!["x@blocked.example", 0]).unwrap_err();

        assert!(err.is_retryable());
        let business = err.as_business().expect("business error");
        assert_eq!(
            business.downcast_ref::<Rejected>(),
            Some(&Rejected("x@blocked.example".to_string()))
        );
    }

    #[test]
    fn nil_able_error_returns_are_outcomes() {
        let binding = HandlerBinding::new(|fail: bool| {
            fail.then(|| std::io::Error::other("disk full"))
        });
        assert!(binding.execute(&args![false]).is_ok());
        let err = binding.execute(&args![true]).unwrap_err();
        assert_eq!(err.to_string(), "job failed: disk full");
    }

    #[test]
    fn anyhow_errors_are_accepted() {
        let binding = HandlerBinding::new(|path: String| -> anyhow::Result<()> {
            anyhow::bail!("cannot open {path}")
        });
        let err = binding.execute(&args!["/tmp/report.csv"]).unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(err.to_string(), "job failed: cannot open /tmp/report.csv");
    }

    #[test]
    fn execute_reports_conversion_failures_as_invocation_errors() {
        let binding = HandlerBinding::new(|level: u8| -> Result<(), BoxError> {
            let _ = level;
            Ok(())
        });

        let err = binding.execute(&args![1024u64]).unwrap_err();
        assert!(matches!(
            err,
            JobError::Invocation(InvocationError::ArgumentMismatch {
                index: 0,
                expected: ArgKind::Uint,
                found: ArgKind::Uint
            })
        ));

        let err = binding.execute(&args!["high"]).unwrap_err();
        assert!(err.is_structural());
    }

    #[test]
    fn execute_requires_exactly_one_outcome() {
        let silent = HandlerBinding::from_dyn(Scripted {
            signature: Signature::job(vec![]),
            returns: Vec::new,
        });
        assert!(matches!(
            silent.execute(&ArgumentList::new()),
            Err(JobError::Invocation(InvocationError::ReturnArity { found: 0 }))
        ));

        let chatty = HandlerBinding::from_dyn(Scripted {
            signature: Signature::job(vec![]),
            returns: || vec![Returned::Outcome(Ok(())), Returned::Outcome(Ok(()))],
        });
        assert!(matches!(
            chatty.execute(&ArgumentList::new()),
            Err(JobError::Invocation(InvocationError::ReturnArity { found: 2 }))
        ));

        let valued = HandlerBinding::from_dyn(Scripted {
            signature: Signature::job(vec![]),
            returns: || vec![Returned::Value(ArgValue::Bool(true))],
        });
        assert!(matches!(
            valued.execute(&ArgumentList::new()),
            Err(JobError::Invocation(InvocationError::ReturnNotOutcome {
                found: ArgKind::Bool
            }))
        ));
    }

    #[test]
    fn panics_surface_as_invocation_errors() {
        let binding = HandlerBinding::new(|id: u64| -> Result<(), BoxError> {
            panic!("invoice {id} vanished")
        });
        let err = binding.execute(&args![7u64]).unwrap_err();
        match err {
            JobError::Invocation(InvocationError::Panicked(msg)) => {
                assert_eq!(msg, "invoice 7 vanished");
            }
            other => panic!("expected panic to be reported, got {other:?}"),
        }
    }

    #[test]
    fn a_binding_serves_concurrent_executions() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let binding = HandlerBinding::new(move |n: u32| -> Result<(), BoxError> {
            counter.fetch_add(n as usize, Ordering::SeqCst);
            Ok(())
        });

        std::thread::scope(|s| {
            for _ in 0..8 {
                let binding = binding.clone();
                s.spawn(move || {
                    for _ in 0..100 {
                        binding.execute(&args![1u32]).unwrap();
                    }
                });
            }
        });
        assert_eq!(calls.load(Ordering::SeqCst), 800);
    }

    fn any_value() -> impl Strategy<Value = ArgValue> {
        prop_oneof![
            any::<i64>().prop_map(ArgValue::Int),
            any::<u64>().prop_map(ArgValue::Uint),
            any::<bool>().prop_map(ArgValue::Bool),
            "[a-z]{0,8}".prop_map(ArgValue::Str),
        ]
    }

    proptest! {
        /// Property: validate fails iff the arity differs or some kind mismatches.
        #[test]
        fn validate_fails_iff_shape_differs(values in prop::collection::vec(any_value(), 0..5)) {
            let binding = HandlerBinding::new(|_a: i64, _b: String, _c: bool| -> Result<(), BoxError> {
                Ok(())
            });
            let expected = [ArgKind::Int, ArgKind::Str, ArgKind::Bool];
            let list = ArgumentList::from(values);

            let should_fail = list.len() != expected.len()
                || list.iter().zip(expected.iter()).any(|(v, k)| v.kind() != *k);
            prop_assert_eq!(binding.validate(&list).is_err(), should_fail);
        }
    }
}
