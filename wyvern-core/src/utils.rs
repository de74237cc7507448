//! Utility functions for the container
//!
//! This module provides common utility functions used throughout the crate,
//! following Rust best practices for naming conventions and string manipulation.

/// Naming convention utilities for bean qualifiers
pub mod naming {
    /// Converts a PascalCase type name to camelCase for qualifier naming.
    ///
    /// This is the default qualifier strategy, similar to Spring's behavior
    /// where `UserService` becomes `userService`.
    ///
    /// # Examples
    ///
    /// ```
    /// use wyvern_core::utils::naming::to_camel_case;
    ///
    /// assert_eq!(to_camel_case("UserService"), "userService");
    /// assert_eq!(to_camel_case("DatabaseConnectionPool"), "databaseConnectionPool");
    /// assert_eq!(to_camel_case("A"), "a");
    /// assert_eq!(to_camel_case(""), "");
    /// ```
    pub fn to_camel_case(s: &str) -> String {
        let mut chars = s.chars();
        match chars.next() {
            None => String::new(),
            Some(first) => {
                let mut result = String::with_capacity(s.len());
                result.extend(first.to_lowercase());
                result.push_str(chars.as_str());
                result
            }
        }
    }

    /// Strips the module path from a fully-qualified Rust type name.
    ///
    /// `std::any::type_name` returns paths like `demo::service::UserService`;
    /// qualifiers and diagnostics want the short `UserService` form.
    ///
    /// # Examples
    ///
    /// ```
    /// use wyvern_core::utils::naming::short_type_name;
    ///
    /// assert_eq!(short_type_name("demo::service::UserService"), "UserService");
    /// assert_eq!(short_type_name("UserService"), "UserService");
    /// assert_eq!(short_type_name("dyn demo::MessageSender"), "MessageSender");
    /// ```
    pub fn short_type_name(full: &str) -> &str {
        full.rsplit("::").next().unwrap_or(full)
    }

    /// Default qualifier for a type: the camelCase form of its short name.
    pub fn default_qualifier(full_type_name: &str) -> String {
        to_camel_case(short_type_name(full_type_name))
    }
}
