//! Aggregation of the shares of a single-round protocol.

use crate::Result;

/// Aggregate shares in an MPC protocol.
///
/// The aggregation of shares is commutative and associative, so that shares
/// can be aggregated in any order, and partial aggregates can themselves be
/// aggregated.
pub trait Aggregate<S>: Sized {
    /// Aggregate shares in an MPC protocol.
    fn from_shares<T>(iter: T) -> Result<Self>
    where
        T: IntoIterator<Item = S>;
}

#[diagnostic::do_not_recommend]
impl<S, A> Aggregate<Result<S>> for A
where
    A: Aggregate<S>,
{
    fn from_shares<T>(iter: T) -> Result<Self>
    where
        T: IntoIterator<Item = Result<S>>,
    {
        A::from_shares(iter.into_iter().collect::<Result<Vec<_>>>()?)
    }
}

/// Perform aggregation directly on an iterator of shares.
///
/// The `aggregate` method is analogous to [`Iterator::collect`], but the trait
/// bound required is [`Aggregate`] rather than [`FromIterator`].
pub trait AggregateIter {
    /// The type of share being aggregated.
    type Share;

    /// Aggregate shares in an MPC protocol.
    fn aggregate<A>(self) -> Result<A>
    where
        A: Aggregate<Self::Share>;
}

#[diagnostic::do_not_recommend]
impl<I: Iterator<Item = S>, S> AggregateIter for I {
    type Share = S;

    fn aggregate<A>(self) -> Result<A>
    where
        A: Aggregate<Self::Share>,
    {
        Aggregate::from_shares(self)
    }
}

#[cfg(test)]
mod tests {
    use super::{Aggregate, AggregateIter};
    use crate::{Error, Result};

    #[derive(Debug, PartialEq, Eq)]
    struct Xor(u64);

    impl Aggregate<u64> for Xor {
        fn from_shares<T>(iter: T) -> Result<Self>
        where
            T: IntoIterator<Item = u64>,
        {
            let mut shares = iter.into_iter();
            let first = shares.next().ok_or(Error::TooFewValues(0, 1))?;
            Ok(Xor(shares.fold(first, |acc, s| acc ^ s)))
        }
    }

    #[test]
    fn aggregate_iter_collects_shares() -> Result<()> {
        let xor = vec![1u64, 2, 4].into_iter().aggregate::<Xor>()?;
        assert_eq!(xor, Xor(7));
        Ok(())
    }

    #[test]
    fn aggregate_result_stops_at_first_error() {
        let shares = vec![Ok(1u64), Err(Error::SerializationError), Ok(3)];
        assert_eq!(
            <Xor as Aggregate<Result<u64>>>::from_shares(shares),
            Err(Error::SerializationError)
        );
        assert_eq!(
            Vec::<u64>::new().into_iter().aggregate::<Xor>(),
            Err(Error::TooFewValues(0, 1))
        );
    }
}
