use std::sync::atomic::{ AtomicU64, Ordering };

/* A process-wide counter handing out identities. Declare one per kind of
 * object with identitynumber!(NAME) and call NAME.next().
 */
pub struct IdentityNumber(AtomicU64);

impl IdentityNumber {
    pub const fn new() -> IdentityNumber { IdentityNumber(AtomicU64::new(0)) }

    pub fn next(&self) -> u64 { self.0.fetch_add(1,Ordering::SeqCst)+1 }
}

#[macro_export]
macro_rules! identitynumber {
    ($name:ident) => {
        static $name : $crate::identity::IdentityNumber = $crate::identity::IdentityNumber::new();
    }
}

#[cfg(test)]
mod test {
    identitynumber!(TEST_IDENTITY);

    #[test]
    pub fn test_identity_increases() {
        let a = TEST_IDENTITY.next();
        let b = TEST_IDENTITY.next();
        assert!(a>0);
        assert!(b>a);
    }
}
