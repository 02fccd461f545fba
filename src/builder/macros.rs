//! Macros for ergonomic state declaration.

/// Generate a `State` implementation for a fieldless enum.
///
/// # Example
///
/// ```
/// use stepwise::state_enum;
/// use stepwise::core::State;
///
/// state_enum! {
///     pub enum ShiftState {
///         Offline,
///         Online,
///         Driving,
///         Ended,
///     }
///     final: [Ended]
/// }
///
/// assert_eq!(ShiftState::Driving.name(), "Driving");
/// assert!(ShiftState::Ended.is_final());
/// ```
#[macro_export]
macro_rules! state_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident
            ),* $(,)?
        }

        $(final: [$($final:ident),* $(,)?])?
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
        $vis enum $name {
            $(
                $(#[$variant_meta])*
                $variant
            ),*
        }

        impl $crate::core::State for $name {
            fn name(&self) -> &str {
                match self {
                    $(Self::$variant => stringify!($variant)),*
                }
            }

            fn is_final(&self) -> bool {
                match self {
                    $($(Self::$final => true,)*)?
                    #[allow(unreachable_patterns)]
                    _ => false,
                }
            }
        }
    };
}
