//! Typed numeric aggregates.
//!
//! `sum` and `average` come in one flavour per numeric width, each with a
//! nullable (`_opt`) twin. The whole surface is generated from the table at
//! the bottom of this module; every row names the input [`NumericKind`],
//! the result types and the method names.
//!
//! Single-precision aggregates are not implemented: the plan text carries no
//! width information for them, so they fail with
//! [`IncludeError::NotImplemented`] before any I/O.

use std::fmt;
use std::str::FromStr;

use bson::Bson;
use futures::future::BoxFuture;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::error::{IncludeError, IncludeResult};
use crate::query::QueryOp;
use crate::queryable::{AggregateQuery, AggregateQueryable};

/// Numeric width of an aggregated field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumericKind {
    /// 128-bit decimal.
    Decimal,
    /// 64-bit float.
    Double,
    /// 32-bit float.
    Single,
    /// 32-bit integer.
    Int32,
    /// 64-bit integer.
    Int64,
}

impl NumericKind {
    /// Every kind, in declaration order.
    pub const ALL: [NumericKind; 5] = [
        Self::Decimal,
        Self::Double,
        Self::Single,
        Self::Int32,
        Self::Int64,
    ];

    /// Display name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Decimal => "decimal",
            Self::Double => "double",
            Self::Single => "single",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
        }
    }

    /// Whether aggregates over this kind can be executed.
    pub fn is_supported(self) -> bool {
        !matches!(self, Self::Single)
    }
}

impl fmt::Display for NumericKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A numeric aggregate result that can be read back from BSON.
pub trait NumericValue: Sized + Send + 'static {
    /// Width of the value.
    const KIND: NumericKind;

    /// The additive identity, returned by a sum over no documents.
    fn zero() -> Self;

    /// Convert the scalar produced by the server.
    fn from_bson(value: &Bson) -> IncludeResult<Self>;
}

fn mismatch(value: &Bson, kind: NumericKind) -> IncludeError {
    IncludeError::internal(format!(
        "aggregate produced {:?}, which is not a valid {} value",
        value, kind
    ))
}

/// Read a BSON number as a decimal.
///
/// `Decimal128` values go through their canonical extended JSON string,
/// which is the only textual form the driver exposes.
pub fn decimal_from_bson(value: &Bson) -> IncludeResult<Decimal> {
    match value {
        Bson::Int32(n) => Ok(Decimal::from(*n)),
        Bson::Int64(n) => Ok(Decimal::from(*n)),
        Bson::Double(n) => Decimal::try_from(*n).map_err(|_| mismatch(value, NumericKind::Decimal)),
        Bson::Decimal128(_) => {
            let json = value.clone().into_canonical_extjson();
            let text = json
                .get("$numberDecimal")
                .and_then(|v| v.as_str())
                .ok_or_else(|| mismatch(value, NumericKind::Decimal))?;
            Decimal::from_str(text)
                .or_else(|_| Decimal::from_scientific(text))
                .map_err(|_| mismatch(value, NumericKind::Decimal))
        }
        other => Err(mismatch(other, NumericKind::Decimal)),
    }
}

impl NumericValue for Decimal {
    const KIND: NumericKind = NumericKind::Decimal;

    fn zero() -> Self {
        Decimal::ZERO
    }

    fn from_bson(value: &Bson) -> IncludeResult<Self> {
        decimal_from_bson(value)
    }
}

impl NumericValue for f64 {
    const KIND: NumericKind = NumericKind::Double;

    fn zero() -> Self {
        0.0
    }

    fn from_bson(value: &Bson) -> IncludeResult<Self> {
        match value {
            Bson::Double(n) => Ok(*n),
            Bson::Int32(n) => Ok(f64::from(*n)),
            Bson::Int64(n) => Ok(*n as f64),
            Bson::Decimal128(_) => decimal_from_bson(value)?
                .to_f64()
                .ok_or_else(|| mismatch(value, Self::KIND)),
            other => Err(mismatch(other, Self::KIND)),
        }
    }
}

impl NumericValue for f32 {
    const KIND: NumericKind = NumericKind::Single;

    fn zero() -> Self {
        0.0
    }

    fn from_bson(_value: &Bson) -> IncludeResult<Self> {
        Err(not_implemented(Self::KIND))
    }
}

impl NumericValue for i32 {
    const KIND: NumericKind = NumericKind::Int32;

    fn zero() -> Self {
        0
    }

    fn from_bson(value: &Bson) -> IncludeResult<Self> {
        match value {
            Bson::Int32(n) => Ok(*n),
            Bson::Int64(n) => i32::try_from(*n).map_err(|_| mismatch(value, Self::KIND)),
            Bson::Double(n)
                if n.fract() == 0.0 && (f64::from(i32::MIN)..=f64::from(i32::MAX)).contains(n) =>
            {
                Ok(*n as i32)
            }
            other => Err(mismatch(other, Self::KIND)),
        }
    }
}

impl NumericValue for i64 {
    const KIND: NumericKind = NumericKind::Int64;

    fn zero() -> Self {
        0
    }

    fn from_bson(value: &Bson) -> IncludeResult<Self> {
        match value {
            Bson::Int32(n) => Ok(i64::from(*n)),
            Bson::Int64(n) => Ok(*n),
            Bson::Double(n) if n.fract() == 0.0 && n.abs() < 9.2e18 => Ok(*n as i64),
            other => Err(mismatch(other, Self::KIND)),
        }
    }
}

fn not_implemented(kind: NumericKind) -> IncludeError {
    IncludeError::not_implemented(format!("{} aggregates are not implemented", kind))
}

/// Run a scalar aggregate, treating a missing or null result as `None`.
async fn aggregate<T>(
    query: IncludeResult<AggregateQueryable<T>>,
    op: QueryOp,
    kind: NumericKind,
) -> IncludeResult<Option<Bson>> {
    let query = query?;
    if !kind.is_supported() {
        return Err(not_implemented(kind));
    }
    Ok(query.scalar(vec![op]).await?.filter(|value| !matches!(value, Bson::Null)))
}

fn sum<T, V>(
    query: IncludeResult<AggregateQueryable<T>>,
    field: &str,
    kind: NumericKind,
) -> BoxFuture<'static, IncludeResult<V>>
where
    T: 'static,
    V: NumericValue,
{
    let op = QueryOp::Sum(field.to_string());
    Box::pin(async move {
        match aggregate(query, op, kind).await? {
            Some(value) => V::from_bson(&value),
            None => Ok(V::zero()),
        }
    })
}

fn sum_opt<T, V>(
    query: IncludeResult<AggregateQueryable<T>>,
    field: &str,
    kind: NumericKind,
) -> BoxFuture<'static, IncludeResult<Option<V>>>
where
    T: 'static,
    V: NumericValue,
{
    let op = QueryOp::Sum(field.to_string());
    Box::pin(async move {
        aggregate(query, op, kind)
            .await?
            .map(|value| V::from_bson(&value))
            .transpose()
    })
}

fn average<T, V>(
    query: IncludeResult<AggregateQueryable<T>>,
    field: &str,
    kind: NumericKind,
) -> BoxFuture<'static, IncludeResult<V>>
where
    T: 'static,
    V: NumericValue,
{
    let op = QueryOp::Average(field.to_string());
    Box::pin(async move {
        match aggregate(query, op, kind).await? {
            Some(value) => V::from_bson(&value),
            None => Err(IncludeError::NoElements),
        }
    })
}

fn average_opt<T, V>(
    query: IncludeResult<AggregateQueryable<T>>,
    field: &str,
    kind: NumericKind,
) -> BoxFuture<'static, IncludeResult<Option<V>>>
where
    T: 'static,
    V: NumericValue,
{
    let op = QueryOp::Average(field.to_string());
    Box::pin(async move {
        aggregate(query, op, kind)
            .await?
            .map(|value| V::from_bson(&value))
            .transpose()
    })
}

macro_rules! numeric_aggregates {
    ($(
        $kind:ident: $sum_ty:ty, $avg_ty:ty =>
            $sum:ident, $sum_opt:ident, $average:ident, $average_opt:ident;
    )*) => {
        /// Typed `sum` / `average` over any aggregate query.
        pub trait NumericAggregateExt<T>: AggregateQuery<T>
        where
            T: Send + 'static,
        {
            $(
                #[doc = concat!("Sum of the ", stringify!($kind), " `field`; zero for an empty input.")]
                fn $sum(self, field: &str) -> BoxFuture<'static, IncludeResult<$sum_ty>> {
                    sum(self.into_queryable(), field, NumericKind::$kind)
                }

                #[doc = concat!("Sum of the nullable ", stringify!($kind), " `field`; `None` for an empty input.")]
                fn $sum_opt(self, field: &str) -> BoxFuture<'static, IncludeResult<Option<$sum_ty>>> {
                    sum_opt(self.into_queryable(), field, NumericKind::$kind)
                }

                #[doc = concat!("Average of the ", stringify!($kind), " `field`; fails for an empty input.")]
                fn $average(self, field: &str) -> BoxFuture<'static, IncludeResult<$avg_ty>> {
                    average(self.into_queryable(), field, NumericKind::$kind)
                }

                #[doc = concat!("Average of the nullable ", stringify!($kind), " `field`; `None` for an empty input.")]
                fn $average_opt(self, field: &str) -> BoxFuture<'static, IncludeResult<Option<$avg_ty>>> {
                    average_opt(self.into_queryable(), field, NumericKind::$kind)
                }
            )*
        }
    };
}

numeric_aggregates! {
    Decimal: Decimal, Decimal => sum_decimal, sum_decimal_opt, average_decimal, average_decimal_opt;
    Double: f64, f64 => sum_f64, sum_f64_opt, average_f64, average_f64_opt;
    Single: f32, f32 => sum_f32, sum_f32_opt, average_f32, average_f32_opt;
    Int32: i32, f64 => sum_i32, sum_i32_opt, average_i32, average_i32_opt;
    Int64: i64, f64 => sum_i64, sum_i64_opt, average_i64, average_i64_opt;
}

impl<T, Q> NumericAggregateExt<T> for Q
where
    T: Send + 'static,
    Q: AggregateQuery<T>,
{
}
