//! Implementation of serialization and deserialization.
//!
//! A polynomial is serialized as one byte identifying its representation,
//! followed by the bit-packed residues modulo each modulus of its context.

use super::{Context, Poly, Representation};
use crate::{Error, Result};
use itertools::izip;
use mhe_traits::{DeserializeWithContext, Serialize};
use ndarray::Array2;
use std::sync::Arc;

impl Representation {
    const fn tag(&self) -> u8 {
        match self {
            Representation::PowerBasis => 0,
            Representation::Ntt => 1,
        }
    }

    fn from_tag(tag: u8) -> Result<Self> {
        match tag {
            0 => Ok(Representation::PowerBasis),
            1 => Ok(Representation::Ntt),
            _ => Err(Error::Serialization(format!(
                "Unknown representation tag {tag}"
            ))),
        }
    }
}

impl Poly {
    /// Number of bytes of the serialization of a polynomial in `ctx`.
    pub fn serialization_length(ctx: &Context) -> usize {
        1 + ctx
            .q
            .iter()
            .map(|qi| qi.serialization_length(ctx.degree))
            .sum::<usize>()
    }
}

impl Serialize for Poly {
    fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Poly::serialization_length(&self.ctx));
        out.push(self.representation.tag());
        izip!(self.coefficients.outer_iter(), self.ctx.q.iter()).for_each(|(v, qi)| {
            out.extend(qi.serialize_vec(&v.to_vec()));
        });
        out
    }
}

impl DeserializeWithContext for Poly {
    type Error = Error;
    type Context = Context;

    fn from_bytes(bytes: &[u8], ctx: &Arc<Context>) -> Result<Self> {
        if bytes.len() != Poly::serialization_length(ctx) {
            return Err(Error::Serialization(format!(
                "Invalid length: got {} bytes, expected {}",
                bytes.len(),
                Poly::serialization_length(ctx)
            )));
        }
        let representation = Representation::from_tag(bytes[0])?;

        let mut coefficients = Vec::with_capacity(ctx.q.len() * ctx.degree);
        let mut index = 1;
        for qi in ctx.q.iter() {
            let size = qi.serialization_length(ctx.degree);
            coefficients.extend(qi.deserialize_vec(&bytes[index..index + size], ctx.degree)?);
            index += size;
        }

        let coefficients = Array2::from_shape_vec((ctx.q.len(), ctx.degree), coefficients)
            .map_err(|e| Error::Serialization(e.to_string()))?;
        Ok(Self {
            ctx: ctx.clone(),
            representation,
            coefficients,
        })
    }
}
