//! Guard macros for early-return error handling in contracts.
//!
//! ```ignore
//! ensure!(amount <= self.balance, DaoError::NotEnoughJettons { available, required });
//! ensure_eq!(ctx.sender(), self.owner, DaoError::NotOwner);
//! ```

/// Return early with an error if the condition is false.
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $err:expr) => {
        if !$cond {
            return ::core::result::Result::Err(::core::convert::Into::into($err));
        }
    };
}

/// Return early with an error if two values are not equal.
#[macro_export]
macro_rules! ensure_eq {
    ($left:expr, $right:expr, $err:expr) => {
        if $left != $right {
            return ::core::result::Result::Err(::core::convert::Into::into($err));
        }
    };
}

#[cfg(test)]
mod tests {
    use jdao_types::error::DaoError;

    fn check(a: u32, b: u32) -> Result<(), DaoError> {
        ensure!(a > 0, DaoError::IntegerOverflow);
        ensure_eq!(a, b, DaoError::NotOwner);
        Ok(())
    }

    #[test]
    fn test_guards() {
        assert_eq!(check(0, 0), Err(DaoError::IntegerOverflow));
        assert_eq!(check(1, 2), Err(DaoError::NotOwner));
        assert_eq!(check(2, 2), Ok(()));
    }
}
