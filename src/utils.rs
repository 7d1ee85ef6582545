/// Removes every carriage-return and line-feed character from `input`.
///
/// Record payloads arrive with arbitrary operator-controlled line breaks; the
/// single-line ("compressed") rendering is computed over this stripped form.
pub(crate) fn strip_line_breaks(input: &str) -> String {
    input.chars().filter(|c| *c != '\r' && *c != '\n').collect()
}

/// Used in unit tests to verify type is Thread Safe and Async/Await Safe.
///
/// It enforces that the given type implements the following standard traits:
///
/// * `std::marker::Sized`: type has a constant size known at compile time
/// * `std::marker::Send`: type is safe to send to another thread
/// * `std::marker::Sync`: type is Sync if it is safe to share between threads;
///   type can be Sync if and only if a reference to it is Send
/// * `std::marker::Unpin`: type can be safely moved after pinning
#[cfg(test)]
pub(crate) fn is_thread_safe<T: Sized + Send + Sync + Unpin>() {}
