#[macro_export]
macro_rules! lock {
    ($x: expr) => {{
        match $x.lock() {
            Ok(v) => v,
            Err(_) => {
                panic!("HARDPOINT POISONED LOCK {}/{}/{}",file!(),line!(),column!());
            }
        }
    }}
}

#[cfg(test)]
mod test {
    use std::sync::{ Arc, Mutex };

    #[test]
    pub fn test_lock() {
        let x = Arc::new(Mutex::new(vec![1,2]));
        lock!(x).push(3);
        assert_eq!(vec![1,2,3],*lock!(x));
    }
}
