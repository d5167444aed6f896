// Elevated endpoints: the principal must be admin of the resolved group
pub mod group;
