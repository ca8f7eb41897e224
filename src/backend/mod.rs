//-
// Copyright (c) 2026, Jason Lingle
//
// This file is part of Mailbackend.
//
// Mailbackend is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free
// Software Foundation, either version 3 of the License, or (at your option)
// any later version.
//
// Mailbackend is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or
// FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License for
// more details.
//
// You should have received a copy of the GNU General Public License along with
// Mailbackend. If not, see <http://www.gnu.org/licenses/>.

//! Mail backend definitions: the layered input format, the resolved schema,
//! and the registry they are loaded into.

pub mod active;
pub mod layer;
pub mod model;
pub mod registry;
mod resolve;
pub mod source;
pub mod spam;

pub use self::active::ActiveRegistry;
pub use self::layer::{DefinitionLayer, LayerMode, PartialProfile};
pub use self::model::BackendProfile;
pub use self::registry::{LoaderOptions, Registry};
