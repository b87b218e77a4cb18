use std::collections::BTreeMap;

use anyerror::AnyError;
use bytes::Bytes;
use serde::{Serialize, de::DeserializeOwned};

use crate::codec::MsgSerde;

/// Encoded arguments keyed by parameter name.
#[derive(
    serde::Serialize, serde::Deserialize, Clone, Debug, Default, PartialEq, Eq,
)]
pub struct ArgBundle(BTreeMap<String, Bytes>);

impl ArgBundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Bytes) {
        self.0.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Bytes> {
        self.0.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A typed parameter list, encoded to and decoded from an [`ArgBundle`]
/// by position against an ordered list of names.
pub trait Params: Sized + Send + 'static {
    const ARITY: usize;

    fn encode<S: MsgSerde>(
        &self,
        serde: &S,
        names: &[String],
    ) -> Result<ArgBundle, AnyError>;

    fn decode<S: MsgSerde>(
        serde: &S,
        names: &[String],
        args: &ArgBundle,
    ) -> Result<Self, AnyError>;
}

fn check_arity(names: &[String], arity: usize) -> Result<(), AnyError> {
    if names.len() != arity {
        return Err(AnyError::error(format!(
            "expected {arity} parameter names, got {}",
            names.len()
        )));
    }
    Ok(())
}

fn decode_arg<S, T>(serde: &S, name: &str, args: &ArgBundle) -> Result<T, AnyError>
where
    S: MsgSerde,
    T: DeserializeOwned,
{
    let bytes = args
        .get(name)
        .ok_or_else(|| AnyError::error(format!("missing argument '{name}'")))?;
    serde
        .from_bytes(bytes)
        .map_err(|e| AnyError::error(format!("argument '{name}': {e}")))
}

impl Params for () {
    const ARITY: usize = 0;

    fn encode<S: MsgSerde>(
        &self,
        _serde: &S,
        names: &[String],
    ) -> Result<ArgBundle, AnyError> {
        check_arity(names, Self::ARITY)?;
        Ok(ArgBundle::new())
    }

    fn decode<S: MsgSerde>(
        _serde: &S,
        names: &[String],
        _args: &ArgBundle,
    ) -> Result<Self, AnyError> {
        check_arity(names, Self::ARITY)
    }
}

macro_rules! impl_params {
    ($arity:expr => $($idx:tt $T:ident),+) => {
        impl<$($T),+> Params for ($($T,)+)
        where
            $($T: Serialize + DeserializeOwned + Send + 'static),+
        {
            const ARITY: usize = $arity;

            fn encode<S: MsgSerde>(
                &self,
                serde: &S,
                names: &[String],
            ) -> Result<ArgBundle, AnyError> {
                check_arity(names, Self::ARITY)?;
                let mut args = ArgBundle::new();
                $(args.insert(names[$idx].clone(), serde.to_bytes(&self.$idx)?);)+
                Ok(args)
            }

            fn decode<S: MsgSerde>(
                serde: &S,
                names: &[String],
                args: &ArgBundle,
            ) -> Result<Self, AnyError> {
                check_arity(names, Self::ARITY)?;
                Ok(($(decode_arg::<S, $T>(serde, &names[$idx], args)?,)+))
            }
        }
    };
}

impl_params!(1 => 0 A);
impl_params!(2 => 0 A, 1 B);
impl_params!(3 => 0 A, 1 B, 2 C);
impl_params!(4 => 0 A, 1 B, 2 C, 3 D);
impl_params!(5 => 0 A, 1 B, 2 C, 3 D, 4 E);
impl_params!(6 => 0 A, 1 B, 2 C, 3 D, 4 E, 5 F);
impl_params!(7 => 0 A, 1 B, 2 C, 3 D, 4 E, 5 F, 6 G);
impl_params!(8 => 0 A, 1 B, 2 C, 3 D, 4 E, 5 F, 6 G, 7 H);
